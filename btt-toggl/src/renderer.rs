//! Turns the current entry plus a query into the widget payload.

use tracing::debug;

use crate::config::ConfigError;
use crate::matcher::is_active;
use crate::types::{Activity, IconConfig, ProjectCatalog, Query, StatusPayload, TimeEntry};

/// Text shown by a general widget without a tag: icon only.
pub const ICON_ONLY_TEXT: &str = " ";

#[derive(Debug, Clone)]
pub struct StatusRenderer {
    catalog: ProjectCatalog,
    icons: IconConfig,
}

impl StatusRenderer {
    pub fn new(catalog: ProjectCatalog, icons: IconConfig) -> Self {
        Self { catalog, icons }
    }

    pub fn catalog(&self) -> &ProjectCatalog {
        &self.catalog
    }

    pub fn icon_path(&self, activity: Activity) -> String {
        let path = match activity {
            Activity::Active => &self.icons.active,
            Activity::Inactive => &self.icons.inactive,
        };
        path.to_string_lossy().into_owned()
    }

    pub fn activity(&self, entry: Option<&TimeEntry>, general: bool, query: &Query) -> Activity {
        if general && query.tag.is_none() {
            Activity::from(entry.is_some())
        } else {
            Activity::from(is_active(entry, query))
        }
    }

    /// Widget payload for `query` against `entry`.
    ///
    /// A non-general query whose pair is missing from the catalog is a
    /// configuration error.
    pub fn render(
        &self,
        entry: Option<&TimeEntry>,
        general: bool,
        query: &Query,
    ) -> Result<StatusPayload, ConfigError> {
        let activity = self.activity(entry, general, query);
        self.payload(activity, general, query)
    }

    /// Payload for an already-decided activity.
    pub fn payload(
        &self,
        activity: Activity,
        general: bool,
        query: &Query,
    ) -> Result<StatusPayload, ConfigError> {
        let text = if general {
            query
                .tag
                .clone()
                .unwrap_or_else(|| ICON_ONLY_TEXT.to_string())
        } else {
            let (workspace, project) = match (query.workspace, query.project) {
                (Some(w), Some(p)) => (w, p),
                _ => return Err(ConfigError::IncompleteQuery),
            };
            let name = self
                .catalog
                .display_name(workspace, project)
                .ok_or(ConfigError::UnknownProject { workspace, project })?;
            match &query.tag {
                Some(tag) => format!("{name}: {tag}"),
                None => name.to_string(),
            }
        };

        debug!(%activity, ?query, general, "rendering status");
        Ok(StatusPayload {
            text,
            icon_path: self.icon_path(activity),
        })
    }

    /// Inactive payload shown when the general query cannot reach Toggl.
    pub fn offline(&self, tag: Option<&str>) -> StatusPayload {
        StatusPayload {
            text: tag
                .filter(|t| !t.is_empty())
                .unwrap_or(ICON_ONLY_TEXT)
                .to_string(),
            icon_path: self.icon_path(Activity::Inactive),
        }
    }
}
