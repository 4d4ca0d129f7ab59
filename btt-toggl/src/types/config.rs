use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://api.track.toggl.com/api/v9";
pub const DEFAULT_TAG: &str = "btt-toggl";
pub const CREATED_WITH: &str = "btt-toggl";

/// Workspace id → project id → display name.
///
/// Ids may be written bare (`1000000:`) or quoted (`'1000000':`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProjectCatalog(pub BTreeMap<u64, BTreeMap<u64, String>>);

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct IdKey(u64);

struct IdKeyVisitor;

impl<'de> Visitor<'de> for IdKeyVisitor {
    type Value = IdKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a numeric Toggl id")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<IdKey, E> {
        Ok(IdKey(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<IdKey, E> {
        u64::try_from(v)
            .map(IdKey)
            .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<IdKey, E> {
        v.trim()
            .parse()
            .map(IdKey)
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for IdKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdKeyVisitor)
    }
}

impl<'de> Deserialize<'de> for ProjectCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<IdKey, BTreeMap<IdKey, String>>::deserialize(deserializer)?;
        Ok(ProjectCatalog(
            raw.into_iter()
                .map(|(workspace, projects)| {
                    let projects = projects.into_iter().map(|(p, name)| (p.0, name)).collect();
                    (workspace.0, projects)
                })
                .collect(),
        ))
    }
}

impl ProjectCatalog {
    pub fn display_name(&self, workspace: u64, project: u64) -> Option<&str> {
        self.0
            .get(&workspace)
            .and_then(|projects| projects.get(&project))
            .map(String::as_str)
    }

    pub fn contains(&self, workspace: u64, project: u64) -> bool {
        self.display_name(workspace, project).is_some()
    }

    /// Every (workspace, project, name) triple, ordered by ids.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64, &str)> {
        self.0.iter().flat_map(|(workspace, projects)| {
            projects
                .iter()
                .map(move |(project, name)| (*workspace, *project, name.as_str()))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }

    pub fn insert(&mut self, workspace: u64, project: u64, name: impl Into<String>) {
        self.0
            .entry(workspace)
            .or_default()
            .insert(project, name.into());
    }
}

/// Widget icons; exactly two states exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconConfig {
    pub active: PathBuf,
    pub inactive: PathBuf,
}

/// Options applied to entries this tool creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryConfig {
    #[serde(default = "default_true")]
    pub tag_all_entries: bool,
    #[serde(default = "default_tag")]
    pub default_tag: String,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            tag_all_entries: true,
            default_tag: default_tag(),
        }
    }
}

impl EntryConfig {
    /// Tag list for a freshly started entry.
    pub fn start_tags(&self, tag: Option<&str>) -> Vec<String> {
        let mut tags = Vec::new();
        if let Some(tag) = tag.filter(|t| !t.is_empty()) {
            tags.push(tag.to_string());
        }
        if self.tag_all_entries {
            tags.push(self.default_tag.clone());
        }
        tags
    }
}

/// Top-level btt-toggl configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TogglConfig {
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    pub icons: IconConfig,
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
    #[serde(default)]
    pub entries: EntryConfig,
    #[serde(default = "default_true")]
    pub validation: bool,
    #[serde(default)]
    pub projects: ProjectCatalog,
}

fn default_true() -> bool {
    true
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    5
}

fn default_cache_file() -> PathBuf {
    crate::config::get_default_cache_path()
}
