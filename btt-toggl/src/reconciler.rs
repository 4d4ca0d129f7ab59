//! Start/stop/toggle/tag operations on the remote current entry.
//!
//! Each operation fetches the current entry (unless the caller already holds
//! it), performs at most one mutation, and, when `cache` is set, rewrites the
//! status cache from the resulting state. Nothing is retried.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::cache::StatusCache;
use crate::matcher::matches;
use crate::transport::{TogglError, Transport};
use crate::types::config::CREATED_WITH;
use crate::types::{CurrentEntry, EntryConfig, NewTimeEntry, ProjectCatalog, ProjectRecord, Query, TimeEntry};

const CURRENT_PATH: &str = "me/time_entries/current";
const PROJECTS_PATH: &str = "me/projects";

fn start_path(workspace: u64) -> String {
    format!("workspaces/{workspace}/time_entries")
}

fn entry_path(entry: &TimeEntry) -> String {
    format!("workspaces/{}/time_entries/{}", entry.workspace_id, entry.id)
}

fn stop_path(entry: &TimeEntry) -> String {
    format!("{}/stop", entry_path(entry))
}

/// `start` timestamp in the form Toggl expects: second precision, `Z` suffix.
pub fn format_start(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Keeps the remote current entry and the local status cache in step.
pub struct Reconciler<T: Transport> {
    transport: T,
    cache: StatusCache,
    entries: EntryConfig,
}

impl<T: Transport> Reconciler<T> {
    pub fn new(transport: T, cache: StatusCache, entries: EntryConfig) -> Self {
        Self {
            transport,
            cache,
            entries,
        }
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// Fetch the current entry unless `known` already holds it.
    pub fn current(&self, known: Option<CurrentEntry>) -> Result<CurrentEntry> {
        if let Some(current) = known {
            debug!("Using already-fetched current entry");
            return Ok(current);
        }
        debug!("Getting current entry from Toggl");
        let value = self
            .transport
            .get(CURRENT_PATH)
            .context("Failed to fetch the current time entry")?;
        let entry = decode_entry(value, CURRENT_PATH)?.filter(TimeEntry::is_running);
        let current = CurrentEntry::from(entry);
        debug!(?current, "current entry");
        Ok(current)
    }

    /// Fetch the current entry and rebuild the cache from it.
    pub fn refresh(&self) -> Result<CurrentEntry> {
        let current = self.current(None)?;
        self.finish(current, true)
    }

    /// Start a new entry unconditionally.
    pub fn start(
        &self,
        workspace: u64,
        project: u64,
        tag: Option<&str>,
        cache: bool,
    ) -> Result<CurrentEntry> {
        info!(workspace, project, ?tag, "Starting new entry");
        let now = Utc::now();
        let body = NewTimeEntry {
            workspace_id: workspace,
            project_id: project,
            tags: self.entries.start_tags(tag),
            start: format_start(now),
            duration: -now.timestamp(),
            created_with: CREATED_WITH.to_string(),
        };
        let body = serde_json::to_value(&body)?;

        let path = start_path(workspace);
        let value = self
            .transport
            .post(&path, &body)
            .with_context(|| format!("Failed to start entry for project {project}"))?;
        let entry = require_entry(value, &path)?;
        self.finish(CurrentEntry::Running(entry), cache)
    }

    /// Stop the current entry; a no-op when nothing is running.
    pub fn stop(&self, known: Option<CurrentEntry>, cache: bool) -> Result<CurrentEntry> {
        let entry = match self.current(known)? {
            CurrentEntry::Idle => {
                debug!("Nothing running; stop is a no-op");
                return Ok(CurrentEntry::Idle);
            }
            CurrentEntry::Running(entry) => entry,
        };
        self.stop_entry(&entry)?;
        self.finish(CurrentEntry::Idle, cache)
    }

    /// Stop the entry if it matches, otherwise switch to (or start) the
    /// requested project.
    pub fn toggle(
        &self,
        workspace: u64,
        project: u64,
        tag: Option<&str>,
        cache: bool,
    ) -> Result<CurrentEntry> {
        info!(workspace, project, ?tag, "Toggling");
        let query = Query::project(workspace, project).with_tag(tag);

        if let CurrentEntry::Running(entry) = self.current(None)? {
            let stopped = self.stop_entry(&entry)?.unwrap_or(entry);
            if matches(Some(&stopped), &query) == Some(true) {
                info!(entry_id = stopped.id, "Stopped matching entry");
                return self.finish(CurrentEntry::Idle, cache);
            }
            debug!(entry_id = stopped.id, "Stopped non-matching entry; switching");
        }

        let started = self.start(workspace, project, tag, false)?;
        self.finish(started, cache)
    }

    /// Append `tag` to the running entry; duplicates are not filtered.
    pub fn add_tag(
        &self,
        tag: &str,
        known: Option<CurrentEntry>,
        cache: bool,
    ) -> Result<CurrentEntry> {
        info!(tag, "Adding tag to current entry");
        let entry = match self.current(known)? {
            CurrentEntry::Idle => return Ok(CurrentEntry::Idle),
            CurrentEntry::Running(entry) => entry,
        };
        let mut tags = entry.tags.clone();
        tags.push(tag.to_string());
        let updated = self.update_tags(&entry, tags)?;
        self.finish(updated, cache)
    }

    /// Remove every occurrence of `tag` from the running entry.
    pub fn remove_tag(
        &self,
        tag: &str,
        known: Option<CurrentEntry>,
        cache: bool,
    ) -> Result<CurrentEntry> {
        info!(tag, "Removing tag from current entry");
        let entry = match self.current(known)? {
            CurrentEntry::Idle => return Ok(CurrentEntry::Idle),
            CurrentEntry::Running(entry) => entry,
        };
        let tags: Vec<String> = entry.tags.iter().filter(|t| *t != tag).cloned().collect();
        let updated = self.update_tags(&entry, tags)?;
        self.finish(updated, cache)
    }

    /// Remove `tag` if the running entry has it, otherwise add it.
    pub fn toggle_tag(
        &self,
        tag: &str,
        known: Option<CurrentEntry>,
        cache: bool,
    ) -> Result<CurrentEntry> {
        info!(tag, "Toggling tag on current entry");
        let current = self.current(known)?;
        let has_tag = match current.entry() {
            None => return Ok(CurrentEntry::Idle),
            Some(entry) => entry.has_tag(tag),
        };
        let updated = if has_tag {
            self.remove_tag(tag, Some(current), false)?
        } else {
            self.add_tag(tag, Some(current), false)?
        };
        self.finish(updated, cache)
    }

    /// Every project visible to the token, grouped by workspace.
    pub fn fetch_projects(&self) -> Result<ProjectCatalog> {
        info!("Getting projects from Toggl");
        let value = self
            .transport
            .get(PROJECTS_PATH)
            .context("Failed to list projects")?;
        let records: Vec<ProjectRecord> = if value.is_null() {
            Vec::new()
        } else {
            serde_json::from_value(value).map_err(|e| TogglError::Decode {
                path: PROJECTS_PATH.to_string(),
                message: e.to_string(),
            })?
        };

        let mut catalog = ProjectCatalog::default();
        for record in records {
            if !record.active {
                debug!(project = record.id, "Including archived project {}", record.name);
            }
            catalog.insert(record.workspace_id, record.id, record.name);
        }
        Ok(catalog)
    }

    /// PATCH the stop endpoint; returns the stopped record when Toggl sends one.
    fn stop_entry(&self, entry: &TimeEntry) -> Result<Option<TimeEntry>> {
        info!(entry_id = entry.id, workspace = entry.workspace_id, "Stopping current entry");
        let path = stop_path(entry);
        let value = self
            .transport
            .patch(&path, None)
            .with_context(|| format!("Failed to stop entry {}", entry.id))?;
        Ok(decode_entry(value, &path)?)
    }

    fn update_tags(&self, entry: &TimeEntry, tags: Vec<String>) -> Result<CurrentEntry> {
        debug!(entry_id = entry.id, ?tags, "Updating tags");
        let path = entry_path(entry);
        let body = json!({ "tags": tags });
        let value = self
            .transport
            .put(&path, Some(&body))
            .with_context(|| format!("Failed to update tags on entry {}", entry.id))?;
        Ok(CurrentEntry::Running(require_entry(value, &path)?))
    }

    fn finish(&self, current: CurrentEntry, cache: bool) -> Result<CurrentEntry> {
        if cache {
            Ok(self.cache.write(current)?)
        } else {
            Ok(current)
        }
    }
}

fn decode_entry(value: Value, path: &str) -> Result<Option<TimeEntry>, TogglError> {
    if value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| TogglError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
}

fn require_entry(value: Value, path: &str) -> Result<TimeEntry, TogglError> {
    decode_entry(value, path)?.ok_or_else(|| TogglError::Decode {
        path: path.to_string(),
        message: "expected a time entry, got null".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::renderer::StatusRenderer;
    use crate::transport::fake::FakeTransport;
    use crate::transport::is_connectivity_error;
    use crate::types::IconConfig;

    fn catalog() -> ProjectCatalog {
        let mut catalog = ProjectCatalog::default();
        catalog.insert(1, 10, "Alpha");
        catalog.insert(1, 11, "Beta");
        catalog
    }

    fn reconciler(dir: &Path, transport: FakeTransport) -> Reconciler<FakeTransport> {
        let renderer = StatusRenderer::new(
            catalog(),
            IconConfig {
                active: "/icons/active.png".into(),
                inactive: "/icons/inactive.png".into(),
            },
        );
        let cache = StatusCache::new(dir.join("status.json"), renderer);
        Reconciler::new(transport, cache, EntryConfig::default())
    }

    fn entry_json(id: u64, workspace: u64, project: u64, tags: &[&str]) -> Value {
        json!({
            "id": id,
            "workspace_id": workspace,
            "project_id": project,
            "tags": tags,
            "start": "2024-03-01T09:00:00Z",
            "stop": null,
            "duration": -1709283600,
        })
    }

    fn stopped_json(id: u64, workspace: u64, project: u64, tags: &[&str]) -> Value {
        let mut value = entry_json(id, workspace, project, tags);
        value["stop"] = json!("2024-03-01T10:00:00Z");
        value["duration"] = json!(3600);
        value
    }

    #[test]
    fn test_current_uses_known_entry_without_fetch() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(tmp.path(), FakeTransport::new());
        let current = r.current(Some(CurrentEntry::Idle)).unwrap();
        assert_eq!(current, CurrentEntry::Idle);
        assert!(r.transport.calls().is_empty());
    }

    #[test]
    fn test_current_null_is_idle() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(tmp.path(), FakeTransport::new().respond(Value::Null));
        assert_eq!(r.current(None).unwrap(), CurrentEntry::Idle);
        let calls = r.transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "GET");
        assert_eq!(calls[0].path, "me/time_entries/current");
    }

    #[test]
    fn test_current_ignores_stopped_record() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new().respond(stopped_json(5, 1, 10, &[])),
        );
        assert_eq!(r.current(None).unwrap(), CurrentEntry::Idle);
    }

    #[test]
    fn test_current_decode_error() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(tmp.path(), FakeTransport::new().respond(json!({"id": "x"})));
        let err = r.current(None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TogglError>(),
            Some(TogglError::Decode { .. })
        ));
    }

    #[test]
    fn test_start_request_body() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new().respond(entry_json(7, 1, 10, &["deep", "btt-toggl"])),
        );
        let current = r.start(1, 10, Some("deep"), false).unwrap();
        assert!(current.is_running());
        assert!(!r.cache().path().exists());

        let calls = r.transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "POST");
        assert_eq!(calls[0].path, "workspaces/1/time_entries");
        let body = calls[0].body.as_ref().unwrap();
        assert_eq!(body["workspace_id"], 1);
        assert_eq!(body["project_id"], 10);
        assert_eq!(body["tags"], json!(["deep", "btt-toggl"]));
        assert_eq!(body["created_with"], "btt-toggl");

        let start = body["start"].as_str().unwrap();
        assert!(start.ends_with('Z'));
        assert_eq!(start.len(), "2024-03-01T09:00:00Z".len());
        let parsed = DateTime::parse_from_rfc3339(start).unwrap();
        assert_eq!(body["duration"].as_i64().unwrap(), -parsed.timestamp());
    }

    #[test]
    fn test_start_with_cache_writes_active_status() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new().respond(entry_json(7, 1, 11, &["btt-toggl"])),
        );
        r.start(1, 11, None, true).unwrap();
        assert!(r.cache().read(1, 11).unwrap().contains("/icons/active.png"));
        assert!(r.cache().read(1, 10).unwrap().contains("inactive.png"));
        assert!(r.cache().read_tag("btt-toggl").unwrap());
    }

    #[test]
    fn test_stop_running_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new()
                .respond(entry_json(5, 1, 10, &[]))
                .respond(stopped_json(5, 1, 10, &[])),
        );
        let current = r.stop(None, true).unwrap();
        assert_eq!(current, CurrentEntry::Idle);

        let mutations = r.transport.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].method, "PATCH");
        assert_eq!(mutations[0].path, "workspaces/1/time_entries/5/stop");
        assert!(r.cache().read(1, 10).unwrap().contains("inactive.png"));
    }

    #[test]
    fn test_stop_twice_is_noop_the_second_time() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new()
                .respond(entry_json(5, 1, 10, &[]))
                .respond(stopped_json(5, 1, 10, &[])),
        );
        let first = r.stop(None, false).unwrap();
        let second = r.stop(Some(first), false).unwrap();
        assert_eq!(second, CurrentEntry::Idle);
        assert_eq!(r.transport.mutations().len(), 1);
    }

    #[test]
    fn test_stop_when_idle_only_fetches() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(tmp.path(), FakeTransport::new().respond(Value::Null));
        assert_eq!(r.stop(None, true).unwrap(), CurrentEntry::Idle);
        assert_eq!(r.transport.calls().len(), 1);
        assert!(r.transport.mutations().is_empty());
        assert!(!r.cache().path().exists());
    }

    #[test]
    fn test_toggle_from_idle_starts_and_caches() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new()
                .respond(Value::Null)
                .respond(entry_json(8, 1, 10, &["btt-toggl"])),
        );
        let current = r.toggle(1, 10, None, true).unwrap();
        let entry = current.entry().unwrap();
        assert_eq!((entry.workspace_id, entry.project_id), (1, Some(10)));

        let mutations = r.transport.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].method, "POST");
        let body = mutations[0].body.as_ref().unwrap();
        assert_eq!(body["workspace_id"], 1);
        assert_eq!(body["project_id"], 10);

        assert_eq!(
            r.cache().read(1, 10).unwrap(),
            r#"{"text":"Alpha","icon_path":"/icons/active.png"}"#
        );
    }

    #[test]
    fn test_toggle_matching_entry_stops_it() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new()
                .respond(entry_json(5, 1, 10, &[]))
                .respond(stopped_json(5, 1, 10, &[])),
        );
        let current = r.toggle(1, 10, None, true).unwrap();
        assert_eq!(current, CurrentEntry::Idle);

        let mutations = r.transport.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].method, "PATCH");
        assert_eq!(
            r.cache().read(1, 10).unwrap(),
            r#"{"text":"Alpha","icon_path":"/icons/inactive.png"}"#
        );
        assert!(!r.cache().read_tag("btt-toggl").unwrap());
    }

    #[test]
    fn test_toggle_other_project_switches() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new()
                .respond(entry_json(5, 1, 11, &[]))
                .respond(stopped_json(5, 1, 11, &[]))
                .respond(entry_json(6, 1, 10, &["btt-toggl"])),
        );
        let current = r.toggle(1, 10, None, true).unwrap();
        assert_eq!(current.entry().unwrap().id, 6);

        let methods: Vec<&str> = r.transport.mutations().iter().map(|c| c.method).collect();
        assert_eq!(methods, vec!["PATCH", "POST"]);
        assert!(r.cache().read(1, 10).unwrap().contains("/icons/active.png"));
        assert!(r.cache().read(1, 11).unwrap().contains("inactive.png"));
    }

    #[test]
    fn test_toggle_with_tag_requires_tag_to_match() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new()
                .respond(entry_json(5, 1, 10, &[]))
                .respond(stopped_json(5, 1, 10, &[]))
                .respond(entry_json(6, 1, 10, &["review", "btt-toggl"])),
        );
        let current = r.toggle(1, 10, Some("review"), false).unwrap();
        assert!(current.entry().unwrap().has_tag("review"));
        assert_eq!(r.transport.mutations().len(), 2);
    }

    #[test]
    fn test_add_tag_appends_without_dedup() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new()
                .respond(entry_json(5, 1, 10, &["x"]))
                .respond(entry_json(5, 1, 10, &["x", "x"])),
        );
        r.add_tag("x", None, true).unwrap();

        let mutations = r.transport.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].method, "PUT");
        assert_eq!(mutations[0].path, "workspaces/1/time_entries/5");
        assert_eq!(mutations[0].body, Some(json!({"tags": ["x", "x"]})));
        assert!(r.cache().read_tag("x").unwrap());
    }

    #[test]
    fn test_tag_operations_noop_when_idle() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(tmp.path(), FakeTransport::new());
        assert_eq!(
            r.add_tag("x", Some(CurrentEntry::Idle), true).unwrap(),
            CurrentEntry::Idle
        );
        assert_eq!(
            r.remove_tag("x", Some(CurrentEntry::Idle), true).unwrap(),
            CurrentEntry::Idle
        );
        assert_eq!(
            r.toggle_tag("x", Some(CurrentEntry::Idle), true).unwrap(),
            CurrentEntry::Idle
        );
        assert!(r.transport.calls().is_empty());
        assert!(!r.cache().path().exists());
    }

    #[test]
    fn test_remove_tag_absent_still_updates() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new()
                .respond(entry_json(5, 1, 10, &["a"]))
                .respond(entry_json(5, 1, 10, &["a"])),
        );
        r.remove_tag("zzz", None, false).unwrap();
        let mutations = r.transport.mutations();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].body, Some(json!({"tags": ["a"]})));
    }

    #[test]
    fn test_toggle_tag_removes_present_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new()
                .respond(entry_json(5, 1, 10, &["x"]))
                .respond(entry_json(5, 1, 10, &[])),
        );
        let current = r.toggle_tag("x", None, true).unwrap();
        assert!(current.tags().is_empty());

        let calls = r.transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].method, "PUT");
        assert_eq!(calls[1].body, Some(json!({"tags": []})));
        assert!(!r.cache().read_tag("x").unwrap());
    }

    #[test]
    fn test_toggle_tag_adds_missing_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new()
                .respond(entry_json(5, 1, 10, &["a"]))
                .respond(entry_json(5, 1, 10, &["a", "x"])),
        );
        r.toggle_tag("x", None, true).unwrap();
        let mutations = r.transport.mutations();
        assert_eq!(mutations[0].body, Some(json!({"tags": ["a", "x"]})));
        assert!(r.cache().read_tag("x").unwrap());
    }

    #[test]
    fn test_connectivity_failure_leaves_cache_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new().fail(TogglError::Connectivity("timed out".to_string())),
        );
        let err = r.toggle(1, 10, None, true).unwrap_err();
        assert!(is_connectivity_error(&err));
        assert!(!r.cache().path().exists());
    }

    #[test]
    fn test_refresh_writes_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new().respond(entry_json(5, 1, 11, &["x"])),
        );
        let current = r.refresh().unwrap();
        assert!(current.is_running());
        assert!(r.cache().read(1, 11).unwrap().contains("/icons/active.png"));
        assert!(r.cache().read_tag("x").unwrap());
    }

    #[test]
    fn test_fetch_projects_groups_by_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let r = reconciler(
            tmp.path(),
            FakeTransport::new().respond(json!([
                {"id": 10, "workspace_id": 1, "wid": 1, "name": "Alpha", "active": true},
                {"id": 20, "workspace_id": 2, "wid": 2, "name": "Gamma", "active": false},
                {"id": 11, "workspace_id": 1, "wid": 1, "name": "Beta"}
            ])),
        );
        let catalog = r.fetch_projects().unwrap();
        assert_eq!(catalog.display_name(1, 10), Some("Alpha"));
        assert_eq!(catalog.display_name(1, 11), Some("Beta"));
        assert_eq!(catalog.display_name(2, 20), Some("Gamma"));
    }

    #[test]
    fn test_format_start() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T09:00:00.750Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_start(at), "2024-03-01T09:00:00Z");
    }
}
