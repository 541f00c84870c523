mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reelpipe::JobState;

#[derive(Parser)]
#[command(name = "reelpipe", version)]
#[command(about = "Durable production pipeline for short-form video", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true, default_value = "config/settings.yaml")]
    config: PathBuf,

    /// Log filter directives, e.g. `reelpipe=debug`. RUST_LOG takes precedence.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the inbox, storage and database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Watch the inbox and create jobs until interrupted
    Watch,

    /// Run the stage workers until interrupted
    Workers,

    /// Run the inbox watcher and the stage workers together
    Run,

    /// List jobs, newest first, or in dispatch order for one state
    Jobs {
        #[arg(long)]
        state: Option<JobState>,

        #[arg(long, default_value = "50")]
        limit: u32,
    },

    /// Show one job
    Show { id: i64 },

    /// Job counts per state
    Stats,

    /// Recent audit entries
    Logs {
        /// Only entries for this job
        #[arg(long)]
        job: Option<i64>,

        #[arg(long, default_value = "50")]
        limit: u32,
    },

    /// Approve a job waiting for review
    Approve {
        id: i64,

        #[arg(long, default_value = "operator")]
        reviewer: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Reject a job waiting for review
    Reject {
        id: i64,

        #[arg(long, default_value = "operator")]
        reviewer: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Send a reviewed job back through the pipeline
    SendBack {
        id: i64,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Move a failed job back to NEW
    Requeue { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    reelpipe::logging::init(cli.log_level.as_deref(), cli.log_json)
        .context("Failed to initialize logging")?;

    if let Commands::Init { force } = cli.command {
        return commands::init::run(&cli.config, force);
    }

    let config = commands::load(&cli.config)?;

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Watch => commands::run::watch(config).await,
        Commands::Workers => commands::run::workers(config).await,
        Commands::Run => commands::run::run_all(config).await,
        Commands::Jobs { state, limit } => commands::inspect::jobs(&config, state, limit),
        Commands::Show { id } => commands::inspect::show(&config, id),
        Commands::Stats => commands::inspect::stats(&config),
        Commands::Logs { job, limit } => commands::inspect::logs(&config, job, limit),
        Commands::Approve {
            id,
            reviewer,
            notes,
        } => commands::review::approve(&config, id, &reviewer, notes.as_deref()),
        Commands::Reject {
            id,
            reviewer,
            notes,
        } => commands::review::reject(&config, id, &reviewer, notes.as_deref()),
        Commands::SendBack { id, notes } => {
            commands::review::send_back(&config, id, notes.as_deref())
        }
        Commands::Requeue { id } => commands::review::requeue(&config, id),
    }
}
