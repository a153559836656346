mod cmd;
mod output;
mod root;
mod tree;
mod ui;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, crumb::CrumbSubcommand, docs::DocsSubcommand, task::TaskSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "knl",
    about = "Knowledge Retention Library — task tracking, knowledge crumbs, and documentation drift detection",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: auto-detect from .knowledge/ or .git/)
    #[arg(long, global = true, env = "KNL_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize knl in the current repository
    Init {
        /// Reinitialize even if already initialized
        #[arg(long, short = 'f')]
        force: bool,

        /// Task ID format: jira or github
        #[arg(long, default_value = "jira")]
        format: String,

        /// Project identifier (JIRA project code or GitHub owner/repo)
        #[arg(long, short = 'p')]
        project: Option<String>,
    },

    /// Create a new task (shortcut for 'knl task create')
    Create {
        /// Task ID (e.g. PROJ-123 or '#456')
        task_id: String,

        /// Task title
        #[arg(long, short = 't', default_value = "")]
        title: String,
    },

    /// List all tasks (shortcut for 'knl task list')
    List {
        /// Filter by status
        #[arg(long, short = 's')]
        status: Option<String>,

        /// Include archived tasks
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Show task details (shortcut for 'knl task show')
    Show {
        /// Task ID to show
        task_id: String,
    },

    /// Delete a task (shortcut for 'knl task delete')
    Delete {
        /// Task ID to delete
        task_id: String,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Manage development tasks
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Browse and search knowledge crumbs
    Crumb {
        #[command(subcommand)]
        subcommand: CrumbSubcommand,
    },

    /// Documentation checking and synchronization
    Docs {
        #[command(subcommand)]
        subcommand: DocsSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init {
            force,
            format,
            project,
        } => cmd::init::run(&root, force, &format, project.as_deref()),
        Commands::Create { task_id, title } => {
            cmd::require_repo(&root).and_then(|_| cmd::task::create(&root, &task_id, &title, cli.json))
        }
        Commands::List { status, all } => {
            cmd::require_repo(&root)
                .and_then(|_| cmd::task::list(&root, status.as_deref(), all, cli.json))
        }
        Commands::Show { task_id } => {
            cmd::require_repo(&root).and_then(|_| cmd::task::show(&root, &task_id, cli.json))
        }
        Commands::Delete { task_id, force } => {
            cmd::require_repo(&root)
                .and_then(|_| cmd::task::delete(&root, &task_id, force, cli.json))
        }
        Commands::Task { subcommand } => cmd::task::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Crumb { subcommand } => cmd::crumb::run(&root, subcommand, cli.json),
        Commands::Docs { subcommand } => {
            // The docs pipeline works on the resolved command tree, extracted
            // once per invocation from this same clap definition.
            let cli_tree = tree::extract(&Cli::command(), "knl");
            cmd::docs::run(&root, &cli_tree, subcommand, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
