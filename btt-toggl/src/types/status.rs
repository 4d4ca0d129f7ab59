use serde::{Deserialize, Serialize};

/// Caller's filter for "is this specific thing active".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub workspace: Option<u64>,
    pub project: Option<u64>,
    pub tag: Option<String>,
}

impl Query {
    pub fn new(workspace: Option<u64>, project: Option<u64>, tag: Option<&str>) -> Self {
        Self {
            workspace,
            project,
            tag: tag.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }

    pub fn project(workspace: u64, project: u64) -> Self {
        Self::new(Some(workspace), Some(project), None)
    }

    pub fn tag(tag: &str) -> Self {
        Self::new(None, None, Some(tag))
    }

    pub fn with_tag(mut self, tag: Option<&str>) -> Self {
        self.tag = tag.filter(|t| !t.is_empty()).map(str::to_string);
        self
    }

    /// No workspace/project filter.
    pub fn is_general(&self) -> bool {
        self.workspace.is_none() && self.project.is_none()
    }
}

/// Payload consumed by the BetterTouchTool widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub text: String,
    pub icon_path: String,
}

impl StatusPayload {
    pub fn to_json(&self) -> String {
        // Two string fields cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}
