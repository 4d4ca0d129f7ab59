//! Decides whether the current entry matches a (workspace, project, tag) query.

use tracing::debug;

use crate::types::{Query, TimeEntry};

/// `None` when nothing is running; otherwise whether every supplied filter
/// holds. Omitted filters never cause a mismatch.
pub fn matches(entry: Option<&TimeEntry>, query: &Query) -> Option<bool> {
    let entry = entry?;

    let workspace_match = query.workspace.map_or(true, |w| entry.workspace_id == w);
    let project_match = query.project.map_or(true, |p| entry.project_id == Some(p));
    let tag_match = query.tag.as_deref().map_or(true, |t| entry.has_tag(t));

    let matched = workspace_match && project_match && tag_match;
    if matched {
        debug!(?query, entry_id = entry.id, "matched");
    } else {
        debug!(
            ?query,
            entry_id = entry.id,
            workspace_match,
            project_match,
            tag_match,
            "no match"
        );
    }
    Some(matched)
}

/// Collapses "nothing running" into "not active".
pub fn is_active(entry: Option<&TimeEntry>, query: &Query) -> bool {
    matches(entry, query).unwrap_or(false)
}
