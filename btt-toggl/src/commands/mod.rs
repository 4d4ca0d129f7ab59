//! CLI command implementations

pub mod doctor;
pub mod entry;
pub mod projects;
pub mod status;
pub mod tag;

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::cache::StatusCache;
use crate::config::{ensure_valid, read_config_with_env, resolve_config_path, ConfigError};
use crate::reconciler::Reconciler;
use crate::renderer::StatusRenderer;
use crate::toggl::TogglClient;
use crate::types::TogglConfig;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub no_validation: bool,
}

impl GlobalOptions {
    pub fn config_path(&self) -> PathBuf {
        resolve_config_path(self.config.as_deref())
    }
}

/// A loaded config and whether input checks are on for this run.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: TogglConfig,
    pub validate: bool,
}

impl Session {
    /// Load the config and, unless disabled, validate it.
    pub fn load(opts: &GlobalOptions) -> Result<Self> {
        let session = Self::load_unchecked(opts)?;
        if session.validate {
            session.check_config()?;
        }
        Ok(session)
    }

    /// Load the config without validating it.
    pub fn load_unchecked(opts: &GlobalOptions) -> Result<Self> {
        let path = opts.config_path();
        debug!(path = %path.display(), "loading config");
        let config = read_config_with_env(&path)?;
        Ok(Self::new(config, opts.no_validation))
    }

    pub fn new(config: TogglConfig, no_validation: bool) -> Self {
        let validate = config.validation && !no_validation;
        Self { config, validate }
    }

    /// Config problems plus icon files that do not exist.
    pub fn check_config(&self) -> Result<(), ConfigError> {
        ensure_valid(&self.config)?;
        let missing = missing_icons(&self.config);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(missing))
        }
    }

    /// Reject a pair absent from the catalog before touching the network.
    pub fn check_project(&self, workspace: u64, project: u64) -> Result<(), ConfigError> {
        if self.validate && !self.config.projects.contains(workspace, project) {
            return Err(ConfigError::UnknownProject { workspace, project });
        }
        Ok(())
    }

    pub fn renderer(&self) -> StatusRenderer {
        StatusRenderer::new(self.config.projects.clone(), self.config.icons.clone())
    }

    pub fn cache(&self) -> StatusCache {
        StatusCache::new(self.config.cache_file.clone(), self.renderer())
    }

    pub fn reconciler(&self) -> Result<Reconciler<TogglClient>> {
        let client = TogglClient::new(&self.config)?;
        Ok(Reconciler::new(
            client,
            self.cache(),
            self.config.entries.clone(),
        ))
    }
}

/// Icon paths that do not point at an existing file.
pub fn missing_icons(config: &TogglConfig) -> Vec<String> {
    [
        ("icons.active", &config.icons.active),
        ("icons.inactive", &config.icons.inactive),
    ]
    .into_iter()
    .filter(|(_, path)| !path.is_file())
    .map(|(name, path)| format!("{name} does not exist: {}", path.display()))
    .collect()
}
