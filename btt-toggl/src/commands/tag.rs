//! Tag commands - add, remove or toggle a tag on the running entry

use anyhow::{bail, Result};
use tracing::info;

use super::{GlobalOptions, Session};
use crate::reconciler::Reconciler;
use crate::transport::Transport;
use crate::types::{CurrentEntry, TagAction};

pub fn run(opts: &GlobalOptions, action: TagAction, tag: &str) -> Result<()> {
    let session = Session::load(opts)?;
    let reconciler = session.reconciler()?;
    let current = apply(&reconciler, action, tag)?;
    info!(%action, tag, running = current.is_running(), "done");
    Ok(())
}

pub fn apply<T: Transport>(
    reconciler: &Reconciler<T>,
    action: TagAction,
    tag: &str,
) -> Result<CurrentEntry> {
    if tag.trim().is_empty() {
        bail!("Tag must not be empty");
    }
    match action {
        TagAction::Add => reconciler.add_tag(tag, None, true),
        TagAction::Remove => reconciler.remove_tag(tag, None, true),
        TagAction::Toggle => reconciler.toggle_tag(tag, None, true),
    }
}
