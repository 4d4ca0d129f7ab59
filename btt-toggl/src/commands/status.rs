//! Status command - print the widget payload for a query
//!
//! A general query (no workspace/project) always asks Toggl and rebuilds the
//! cache. A project query only reads the cache.

use std::io::Write;

use anyhow::Result;
use tracing::{debug, warn};

use super::{GlobalOptions, Session};
use crate::cache::StatusCache;
use crate::config::ConfigError;
use crate::reconciler::Reconciler;
use crate::transport::{is_connectivity_error, Transport};
use crate::types::Query;

pub fn run(
    opts: &GlobalOptions,
    workspace: Option<u64>,
    project: Option<u64>,
    tag: Option<&str>,
) -> Result<()> {
    let session = Session::load(opts)?;
    let query = Query::new(workspace, project, tag);
    let mut out = std::io::stdout().lock();

    if query.is_general() {
        let reconciler = session.reconciler()?;
        general(&reconciler, &query, &mut out)
    } else {
        if let (Some(w), Some(p)) = (query.workspace, query.project) {
            session.check_project(w, p)?;
        }
        cached(&session.cache(), &query, &mut out)
    }
}

/// Live status. When Toggl is unreachable the inactive payload is still
/// printed before the error is returned.
pub fn general<T: Transport, W: Write>(
    reconciler: &Reconciler<T>,
    query: &Query,
    out: &mut W,
) -> Result<()> {
    let renderer = reconciler.cache().renderer();
    match reconciler.refresh() {
        Ok(current) => {
            let payload = renderer.render(current.entry(), true, query)?;
            writeln!(out, "{}", payload.to_json())?;
            Ok(())
        }
        Err(e) if is_connectivity_error(&e) => {
            warn!("Toggl unreachable, reporting inactive: {e:#}");
            writeln!(out, "{}", renderer.offline(query.tag.as_deref()).to_json())?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}

/// Project status from the cache, composed with the cached tags when a tag
/// is given.
pub fn cached<W: Write>(cache: &StatusCache, query: &Query, out: &mut W) -> Result<()> {
    let (workspace, project) = match (query.workspace, query.project) {
        (Some(w), Some(p)) => (w, p),
        _ => return Err(ConfigError::IncompleteQuery.into()),
    };
    debug!(workspace, project, tag = ?query.tag, "serving status from cache");
    let line = cache.read_status(workspace, project, query.tag.as_deref())?;
    writeln!(out, "{line}")?;
    Ok(())
}
