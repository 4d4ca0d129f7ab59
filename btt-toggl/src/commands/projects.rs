//! List-projects command - print a `projects:` block for the config file

use anyhow::{bail, Result};
use serde::Serialize;

use super::{GlobalOptions, Session};
use crate::types::ProjectCatalog;

#[derive(Serialize)]
struct ProjectsBlock<'a> {
    projects: &'a ProjectCatalog,
}

pub fn run(opts: &GlobalOptions) -> Result<()> {
    // the catalog is what this command produces, so only the token matters
    let session = Session::load_unchecked(opts)?;
    if session.config.api_token.is_empty() {
        bail!("api_token is not set (or TOGGL_API_TOKEN)");
    }
    let catalog = session.reconciler()?.fetch_projects()?;
    print!("{}", render_projects(&catalog)?);
    Ok(())
}

/// YAML ready to paste into the config.
pub fn render_projects(catalog: &ProjectCatalog) -> Result<String> {
    Ok(serde_yaml::to_string(&ProjectsBlock { projects: catalog })?)
}
