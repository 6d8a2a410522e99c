mod cmd;
mod fallback;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{backups::BackupsSubcommand, config::ConfigSubcommand};
use seo_core::config::PublishMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "seo-agent",
    about = "Turn analysis reports into safe, reviewable SEO edits",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from .seo-agent/ or .git/)
    #[arg(long, global = true, env = "SEO_AGENT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, validate, apply and publish the actions of one or more reports
    Run {
        /// Report files, processed in order
        #[arg(required = true)]
        reports: Vec<PathBuf>,

        /// Resolve everything but write no files and touch no remote
        #[arg(long)]
        dry_run: bool,

        /// Override the configured publish mode (direct | dispatch)
        #[arg(long)]
        mode: Option<PublishMode>,
    },

    /// Print the actions found in a report
    Extract { report: PathBuf },

    /// Print the safety verdict for every action in a report
    Validate { report: PathBuf },

    /// Inspect, restore and prune file backups
    Backups {
        #[command(subcommand)]
        subcommand: BackupsSubcommand,
    },

    /// Create, show and validate the workspace config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Run {
            reports,
            dry_run,
            mode,
        } => cmd::run::run(&root, &reports, dry_run, mode, cli.json),
        Commands::Extract { report } => cmd::extract::run(&root, &report, cli.json),
        Commands::Validate { report } => cmd::validate::run(&root, &report, cli.json),
        Commands::Backups { subcommand } => cmd::backups::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
