use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::error::ConfigError;
use crate::types::TogglConfig;

/// Toggl API tokens are 32 lowercase hex characters; accept any alphanumerics.
static TOKEN_PATTERN: OnceLock<Regex> = OnceLock::new();

fn token_pattern() -> &'static Regex {
    TOKEN_PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid token regex"))
}

pub fn config_exists(path: &Path) -> bool {
    path.is_file()
}

/// Read and parse a YAML config file.
pub fn read_config(path: &Path) -> Result<TogglConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let config: TogglConfig = serde_yaml::from_str(&contents)?;
    Ok(config)
}

/// Read the config file, then apply environment overrides.
///
/// - `TOGGL_API_TOKEN` replaces `api_token`
/// - `BTT_TOGGL_CACHE_FILE` replaces `cache_file`
/// - `BTT_TOGGL_TIMEOUT` replaces `timeout_seconds`
pub fn read_config_with_env(path: &Path) -> Result<TogglConfig, ConfigError> {
    let mut config = read_config(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut TogglConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup("TOGGL_API_TOKEN") {
        config.api_token = token.trim().to_string();
    }
    if let Some(cache_file) = lookup("BTT_TOGGL_CACHE_FILE") {
        config.cache_file = PathBuf::from(cache_file);
    }
    if let Some(timeout) = lookup("BTT_TOGGL_TIMEOUT") {
        config.timeout_seconds = timeout.trim().parse().map_err(|_| {
            ConfigError::ValidationError(vec![format!(
                "BTT_TOGGL_TIMEOUT must be a whole number of seconds, got '{timeout}'"
            )])
        })?;
    }
    Ok(())
}

/// Collect every problem with the config; an empty list means valid.
pub fn validate_config(config: &TogglConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if config.api_token.is_empty() {
        errors.push("api_token is not set (or TOGGL_API_TOKEN)".to_string());
    } else if !token_pattern().is_match(&config.api_token) {
        errors.push("api_token must contain only letters and digits".to_string());
    }

    if !config.api_url.starts_with("https://") && !config.api_url.starts_with("http://") {
        errors.push(format!("api_url must be an http(s) URL: {}", config.api_url));
    }

    if config.timeout_seconds == 0 {
        errors.push("timeout_seconds must be greater than zero".to_string());
    }

    for (name, path) in [
        ("icons.active", &config.icons.active),
        ("icons.inactive", &config.icons.inactive),
    ] {
        if !path.is_absolute() {
            errors.push(format!("{name} must be an absolute path: {}", path.display()));
        }
    }

    if config.entries.tag_all_entries && config.entries.default_tag.trim().is_empty() {
        errors.push("entries.default_tag must not be empty when tag_all_entries is set".to_string());
    }

    if config.projects.is_empty() {
        errors.push("projects is empty; run `btt-toggl list-projects` to generate it".to_string());
    }
    for (workspace, project, name) in config.projects.iter() {
        if name.trim().is_empty() {
            errors.push(format!(
                "project {project} in workspace {workspace} has an empty display name"
            ));
        }
    }

    errors
}

/// Fail with every validation problem at once.
pub fn ensure_valid(config: &TogglConfig) -> Result<(), ConfigError> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors))
    }
}
