//! On-disk projection of per-project and per-tag activity.
//!
//! The cache file is a JSON object keyed by workspace id, then project id,
//! holding the pre-serialized widget payload for every catalog pair, plus a
//! reserved `tags` key with the tags of the running entry:
//!
//! ```json
//! {"tags": ["btt-toggl"], "1": {"10": "{\"text\":\"Alpha\",\"icon_path\":\"...\"}"}}
//! ```
//!
//! It is always rebuilt wholesale from the current entry and written with a
//! uniquely named temp file + rename, so readers see either the old or the
//! new projection, even when several invocations write at once.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::ConfigError;
use crate::renderer::StatusRenderer;
use crate::types::{Activity, CurrentEntry, Query, StatusPayload};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to read cache file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write cache file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed cache file {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },
    #[error("No cached status for project {project} in workspace {workspace}; run `btt-toggl status` to refresh")]
    UnknownProject { workspace: u64, project: u64 },
    #[error(transparent)]
    Render(#[from] ConfigError),
}

/// Serialized shape of the cache file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    tags: Vec<String>,
    #[serde(flatten)]
    projects: BTreeMap<String, BTreeMap<String, String>>,
}

impl CacheFile {
    fn status(&self, workspace: u64, project: u64) -> Option<&String> {
        self.projects
            .get(&workspace.to_string())
            .and_then(|projects| projects.get(&project.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct StatusCache {
    path: PathBuf,
    renderer: StatusRenderer,
}

impl StatusCache {
    pub fn new(path: impl Into<PathBuf>, renderer: StatusRenderer) -> Self {
        Self {
            path: path.into(),
            renderer,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn renderer(&self) -> &StatusRenderer {
        &self.renderer
    }

    /// Rebuild the cache from `current` and return it unchanged.
    pub fn write(&self, current: CurrentEntry) -> Result<CurrentEntry, CacheError> {
        debug!(path = %self.path.display(), running = current.is_running(), "writing cache");
        let entry = current.entry();

        let mut file = CacheFile {
            tags: current.tags().to_vec(),
            projects: BTreeMap::new(),
        };
        for (workspace, project, _) in self.renderer.catalog().iter() {
            let payload = self
                .renderer
                .render(entry, false, &Query::project(workspace, project))?;
            file.projects
                .entry(workspace.to_string())
                .or_default()
                .insert(project.to_string(), payload.to_json());
        }
        debug!(tags = ?file.tags, "cached active tags");

        self.atomic_write(&file)?;
        Ok(current)
    }

    /// Stored payload string for a catalog pair.
    pub fn read(&self, workspace: u64, project: u64) -> Result<String, CacheError> {
        debug!(workspace, project, "reading cached status");
        let file = self.load()?;
        file.status(workspace, project)
            .cloned()
            .ok_or(CacheError::UnknownProject { workspace, project })
    }

    /// Whether `tag` was on the running entry at the last write.
    pub fn read_tag(&self, tag: &str) -> Result<bool, CacheError> {
        let file = self.load()?;
        let found = file.tags.iter().any(|t| t == tag);
        debug!(tag, found, "looked up cached tag");
        Ok(found)
    }

    /// Cached status for a project, optionally narrowed to a tag.
    ///
    /// With a tag the pair must be cached active and the tag cached on the
    /// running entry.
    pub fn read_status(
        &self,
        workspace: u64,
        project: u64,
        tag: Option<&str>,
    ) -> Result<String, CacheError> {
        let tag = match tag.filter(|t| !t.is_empty()) {
            Some(tag) => tag,
            None => return self.read(workspace, project),
        };

        let file = self.load()?;
        let stored = file
            .status(workspace, project)
            .ok_or(CacheError::UnknownProject { workspace, project })?;
        let stored: StatusPayload =
            serde_json::from_str(stored).map_err(|e| CacheError::Malformed {
                path: self.path.clone(),
                message: format!("status for {workspace}/{project}: {e}"),
            })?;

        let project_active = stored.icon_path == self.renderer.icon_path(Activity::Active);
        let tag_active = file.tags.iter().any(|t| t == tag);
        let query = Query::project(workspace, project).with_tag(Some(tag));
        let payload =
            self.renderer
                .payload(Activity::from(project_active && tag_active), false, &query)?;
        Ok(payload.to_json())
    }

    fn load(&self) -> Result<CacheFile, CacheError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| CacheError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|e| CacheError::Malformed {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn atomic_write(&self, file: &CacheFile) -> Result<(), CacheError> {
        let write_err = |source: std::io::Error| CacheError::Write {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string(file).map_err(|e| CacheError::Malformed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent,
            None => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        // one temp file per writer
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(json.as_bytes()).map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IconConfig, ProjectCatalog, TimeEntry};

    fn renderer() -> StatusRenderer {
        let mut catalog = ProjectCatalog::default();
        catalog.insert(1, 10, "Alpha");
        catalog.insert(1, 11, "Beta");
        catalog.insert(2, 20, "Gamma");
        StatusRenderer::new(
            catalog,
            IconConfig {
                active: "/icons/active.png".into(),
                inactive: "/icons/inactive.png".into(),
            },
        )
    }

    fn cache_in(dir: &Path) -> StatusCache {
        StatusCache::new(dir.join("nested").join("status.json"), renderer())
    }

    fn running(workspace: u64, project: u64, tags: &[&str]) -> CurrentEntry {
        CurrentEntry::Running(TimeEntry {
            id: 5,
            workspace_id: workspace,
            project_id: Some(project),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            start: "2024-03-01T09:00:00Z".to_string(),
            stop: None,
            duration: -1709283600,
            description: None,
            created_with: None,
        })
    }

    #[test]
    fn test_write_then_read_matches_renderer() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(tmp.path());
        let current = running(1, 10, &["x"]);

        let returned = cache.write(current.clone()).unwrap();
        assert_eq!(returned, current);

        let r = renderer();
        for (w, p, _) in r.catalog().iter() {
            let expected = r
                .render(current.entry(), false, &Query::project(w, p))
                .unwrap()
                .to_json();
            assert_eq!(cache.read(w, p).unwrap(), expected);
        }
        assert_eq!(
            cache.read(1, 10).unwrap(),
            r#"{"text":"Alpha","icon_path":"/icons/active.png"}"#
        );
    }

    #[test]
    fn test_write_idle_marks_everything_inactive() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(tmp.path());
        cache.write(CurrentEntry::Idle).unwrap();

        for (w, p) in [(1, 10), (1, 11), (2, 20)] {
            assert!(cache.read(w, p).unwrap().contains("inactive.png"));
        }
        assert!(!cache.read_tag("x").unwrap());

        let raw = fs::read_to_string(cache.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["tags"], serde_json::json!([]));
        assert!(value["2"]["20"].is_string());
    }

    #[test]
    fn test_write_replaces_previous_projection() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(tmp.path());
        cache.write(running(1, 10, &["x"])).unwrap();
        cache.write(running(2, 20, &[])).unwrap();

        assert!(cache.read(1, 10).unwrap().contains("inactive.png"));
        assert!(cache.read(2, 20).unwrap().contains("/icons/active.png"));
        assert!(!cache.read_tag("x").unwrap());
        let leftovers = fs::read_dir(tmp.path().join("nested")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_read_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(tmp.path());
        cache.write(running(1, 10, &["x", "btt-toggl"])).unwrap();
        assert!(cache.read_tag("x").unwrap());
        assert!(cache.read_tag("btt-toggl").unwrap());
        assert!(!cache.read_tag("y").unwrap());
    }

    #[test]
    fn test_read_unknown_pair() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(tmp.path());
        cache.write(CurrentEntry::Idle).unwrap();
        let err = cache.read(9, 90).unwrap_err();
        assert!(matches!(
            err,
            CacheError::UnknownProject {
                workspace: 9,
                project: 90
            }
        ));
    }

    #[test]
    fn test_missing_cache_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(tmp.path());
        assert!(matches!(cache.read(1, 10), Err(CacheError::Read { .. })));
        assert!(matches!(cache.read_tag("x"), Err(CacheError::Read { .. })));
    }

    #[test]
    fn test_malformed_cache_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("status.json");
        fs::write(&path, "{not json").unwrap();
        let cache = StatusCache::new(&path, renderer());
        assert!(matches!(cache.read(1, 10), Err(CacheError::Malformed { .. })));

        // a cache without the reserved tags key is not silently accepted
        fs::write(&path, r#"{"1": {"10": "x"}}"#).unwrap();
        assert!(matches!(cache.read_tag("x"), Err(CacheError::Malformed { .. })));
    }

    #[test]
    fn test_read_status_with_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = cache_in(tmp.path());
        cache.write(running(1, 10, &["x"])).unwrap();

        assert_eq!(
            cache.read_status(1, 10, Some("x")).unwrap(),
            r#"{"text":"Alpha: x","icon_path":"/icons/active.png"}"#
        );
        assert_eq!(
            cache.read_status(1, 10, Some("y")).unwrap(),
            r#"{"text":"Alpha: y","icon_path":"/icons/inactive.png"}"#
        );
        assert_eq!(
            cache.read_status(1, 11, Some("x")).unwrap(),
            r#"{"text":"Beta: x","icon_path":"/icons/inactive.png"}"#
        );
        assert_eq!(cache.read_status(1, 10, None).unwrap(), cache.read(1, 10).unwrap());
    }

    #[test]
    fn test_concurrent_writers_never_publish_partial_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut catalog = ProjectCatalog::default();
        for p in 0..200 {
            catalog.insert(1, p, format!("Project {p}"));
        }
        let cache = StatusCache::new(
            tmp.path().join("status.json"),
            StatusRenderer::new(
                catalog,
                IconConfig {
                    active: "/icons/active.png".into(),
                    inactive: "/icons/inactive.png".into(),
                },
            ),
        );
        cache.write(CurrentEntry::Idle).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let cache = cache.clone();
                    scope.spawn(move || {
                        for _ in 0..100 {
                            let current = if i % 2 == 0 {
                                CurrentEntry::Idle
                            } else {
                                running(1, 7, &["x"])
                            };
                            cache.write(current).unwrap();
                            if let Err(e) = cache.read_tag("x") {
                                panic!("read during concurrent writes failed: {e}");
                            }
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("status.json")]);
    }
}
