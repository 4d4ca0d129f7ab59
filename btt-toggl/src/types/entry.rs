use serde::{Deserialize, Deserializer, Serialize};

/// Toggl time entry (subset of what the v9 API returns)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: u64,
    pub workspace_id: u64,
    #[serde(default)]
    pub project_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub stop: Option<String>,
    #[serde(default)]
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_with: Option<String>,
}

impl TimeEntry {
    /// Running entries carry a negative duration until stopped.
    pub fn is_running(&self) -> bool {
        self.duration < 0 && self.stop.is_none()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Toggl sends `"tags": null` for untagged entries.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// State of the remote "current entry" singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentEntry {
    Idle,
    Running(TimeEntry),
}

impl CurrentEntry {
    pub fn entry(&self) -> Option<&TimeEntry> {
        match self {
            CurrentEntry::Idle => None,
            CurrentEntry::Running(entry) => Some(entry),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, CurrentEntry::Running(_))
    }

    /// Tags of the running entry, empty when idle.
    pub fn tags(&self) -> &[String] {
        match self {
            CurrentEntry::Idle => &[],
            CurrentEntry::Running(entry) => &entry.tags,
        }
    }
}

impl From<Option<TimeEntry>> for CurrentEntry {
    fn from(entry: Option<TimeEntry>) -> Self {
        match entry {
            Some(entry) => CurrentEntry::Running(entry),
            None => CurrentEntry::Idle,
        }
    }
}

/// Body sent to create a new running entry.
#[derive(Debug, Clone, Serialize)]
pub struct NewTimeEntry {
    pub workspace_id: u64,
    pub project_id: u64,
    pub tags: Vec<String>,
    pub start: String,
    pub duration: i64,
    pub created_with: String,
}

/// Project record from `/me/projects`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectRecord {
    pub id: u64,
    pub workspace_id: u64,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
