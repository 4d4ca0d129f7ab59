pub mod cache;
pub mod commands;
pub mod config;
pub mod logging;
pub mod matcher;
pub mod reconciler;
pub mod renderer;
pub mod toggl;
pub mod transport;
pub mod types;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use commands::GlobalOptions;
use types::TagAction;

#[derive(Parser)]
#[command(
    name = "btt-toggl",
    version,
    about = "Toggl current-entry status and toggles for BetterTouchTool widgets",
    long_about = "Reports whether a Toggl project or tag is running as a BetterTouchTool widget payload, and starts, stops or retags the current entry."
)]
struct Cli {
    /// Config file (default: $BTT_TOGGL_CONFIG or ~/.config/btt-toggl/config.yaml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, global = true)]
    debug: bool,

    /// Log info output to stderr
    #[arg(long, global = true)]
    info: bool,

    /// Skip config, catalog and icon checks
    #[arg(long, global = true)]
    no_validation: bool,

    #[command(subcommand)]
    command: Command,
}

/// Workspace and project of an entry to start or toggle.
#[derive(Args)]
struct ProjectArgs {
    /// Toggl workspace id
    #[arg(short, long)]
    workspace: u64,

    /// Toggl project id
    #[arg(short, long)]
    project: u64,

    /// Tag to add to the new entry
    #[arg(short, long)]
    tag: Option<String>,
}

#[derive(Args)]
struct TagArgs {
    /// Tag name
    #[arg(short, long)]
    tag: String,
}

#[derive(Subcommand)]
enum Command {
    /// Print the widget payload (live without -w/-p, cached with them)
    Status {
        /// Toggl workspace id
        #[arg(short, long, requires = "project")]
        workspace: Option<u64>,

        /// Toggl project id
        #[arg(short, long, requires = "workspace")]
        project: Option<u64>,

        /// Report on a tag instead of (or on top of) a project
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Stop the entry if it matches, otherwise start it
    Toggle(ProjectArgs),

    /// Start a new entry
    Start(ProjectArgs),

    /// Stop the running entry
    Stop,

    /// Add a tag to the running entry
    #[command(name = "add_tag", alias = "add-tag")]
    AddTag(TagArgs),

    /// Remove a tag from the running entry
    #[command(name = "remove_tag", alias = "remove-tag")]
    RemoveTag(TagArgs),

    /// Add the tag if missing, remove it if present
    #[command(name = "toggle_tag", alias = "toggle-tag")]
    ToggleTag(TagArgs),

    /// Print every project as a YAML `projects:` block for the config
    #[command(name = "list-projects", alias = "get_project_dict")]
    ListProjects,

    /// Check configuration, icons, cache and Toggl reachability
    Doctor,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(logging::level_from_flags(cli.debug, cli.info));

    let opts = GlobalOptions {
        config: cli.config,
        no_validation: cli.no_validation,
    };

    let (name, result) = match cli.command {
        Command::Status {
            workspace,
            project,
            tag,
        } => (
            "Status",
            commands::status::run(&opts, workspace, project, tag.as_deref()),
        ),
        Command::Toggle(args) => (
            "Toggle",
            commands::entry::toggle(&opts, args.workspace, args.project, args.tag.as_deref()),
        ),
        Command::Start(args) => (
            "Start",
            commands::entry::start(&opts, args.workspace, args.project, args.tag.as_deref()),
        ),
        Command::Stop => ("Stop", commands::entry::stop(&opts)),
        Command::AddTag(args) => (
            "Add tag",
            commands::tag::run(&opts, TagAction::Add, &args.tag),
        ),
        Command::RemoveTag(args) => (
            "Remove tag",
            commands::tag::run(&opts, TagAction::Remove, &args.tag),
        ),
        Command::ToggleTag(args) => (
            "Toggle tag",
            commands::tag::run(&opts, TagAction::Toggle, &args.tag),
        ),
        Command::ListProjects => ("List projects", commands::projects::run(&opts)),
        Command::Doctor => ("Doctor", commands::doctor::run(&opts)),
    };

    if let Err(e) = result {
        eprintln!("{} error: {:#}", name, e);
        std::process::exit(1);
    }
}
