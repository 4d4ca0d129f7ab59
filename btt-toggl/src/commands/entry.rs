//! Start, stop and toggle commands

use anyhow::Result;
use tracing::info;

use super::{GlobalOptions, Session};

pub fn start(opts: &GlobalOptions, workspace: u64, project: u64, tag: Option<&str>) -> Result<()> {
    let session = Session::load(opts)?;
    session.check_project(workspace, project)?;
    let current = session.reconciler()?.start(workspace, project, tag, true)?;
    info!(entry_id = ?current.entry().map(|e| e.id), "started");
    Ok(())
}

pub fn stop(opts: &GlobalOptions) -> Result<()> {
    let session = Session::load(opts)?;
    session.reconciler()?.stop(None, true)?;
    info!("stopped");
    Ok(())
}

pub fn toggle(
    opts: &GlobalOptions,
    workspace: u64,
    project: u64,
    tag: Option<&str>,
) -> Result<()> {
    let session = Session::load(opts)?;
    session.check_project(workspace, project)?;
    let current = session.reconciler()?.toggle(workspace, project, tag, true)?;
    info!(running = current.is_running(), "toggled");
    Ok(())
}
