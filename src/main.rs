use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod agent;
mod cli;
mod core;
mod daemon;
mod discovery;
mod metrics;
mod scheduler;
#[cfg(test)]
mod testing;

use crate::daemon::Job;

#[derive(Parser)]
#[command(name = "media-inventory")]
#[command(author, version, about = "Round-robin inventory refresh and metrics for media-services monitoring")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/media-inventory/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Also send logs to the systemd journal
    #[arg(long, global = true)]
    journald: bool,

    /// Keep settings store writes in memory only
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every periodic job until interrupted
    Daemon,

    /// Refresh node inventory for the next scope in rotation
    UpdateNodes,

    /// Refresh managed-instance inventory for the next region in rotation
    UpdateSsmNodes,

    /// Refresh subscribed alarm state
    UpdateAlarms,

    /// Refresh connections between inventory nodes
    UpdateConnections,

    /// Send health commands to tagged managed instances
    RunCommands,

    /// Write resource count metrics
    GenerateMetrics,

    /// Send the anonymous usage report
    ReportMetrics,

    /// Record the metric for a command completion event
    ProcessCommandEvent {
        /// Event JSON file, or `-` for stdin
        #[arg(long)]
        file: PathBuf,
    },

    /// Show or replace the inventory region list
    Regions {
        #[command(subcommand)]
        action: RegionsAction,
    },

    /// Show regions, cursors and the next scope per track
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default config and create the install id
    Init,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum RegionsAction {
    /// Print the stored region list
    Show,

    /// Replace the region list (use `global` for global services)
    Set {
        #[arg(required = true)]
        regions: Vec<String>,
    },
}

impl Commands {
    fn job(&self) -> Option<Job> {
        match self {
            Commands::UpdateNodes => Some(Job::Nodes),
            Commands::UpdateSsmNodes => Some(Job::SsmNodes),
            Commands::UpdateAlarms => Some(Job::Alarms),
            Commands::UpdateConnections => Some(Job::Connections),
            Commands::RunCommands => Some(Job::Commands),
            Commands::GenerateMetrics => Some(Job::GenerateMetrics),
            Commands::ReportMetrics => Some(Job::ReportMetrics),
            _ => None,
        }
    }
}

fn init_logging(format: LogFormat, journald: bool, debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (text, json) = match format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer().with_writer(io::stderr)), None),
        LogFormat::Json => (
            None,
            Some(tracing_subscriber::fmt::layer().json().with_writer(io::stderr)),
        ),
    };

    let mut journald_error = None;
    let journald = match journald.then(tracing_journald::layer) {
        Some(Ok(layer)) => Some(layer),
        Some(Err(e)) => {
            journald_error = Some(e);
            None
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .with(journald)
        .init();

    if let Some(e) = journald_error {
        tracing::warn!(error = %e, "Could not connect to journald, logging to stderr only");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let config_path = cli::resolve_config_path(cli.config.as_deref())?;
    let settings = cli::load_settings(&config_path)?;
    init_logging(cli.log_format, cli.journald, settings.debug);
    if config_path.exists() {
        tracing::info!(path = ?config_path, "Loaded config");
    } else {
        tracing::info!(path = ?config_path, "Config file not found, using defaults");
    }
    tracing::debug!(stack = %settings.stack_name, dry_run = cli.dry_run, "Settings loaded");

    match cli.command {
        Commands::Daemon => {
            let ctx = cli::job_context(settings, cli.dry_run).await?;
            daemon::run(ctx).await
        }
        Commands::ProcessCommandEvent { file } => {
            let ctx = cli::job_context(settings, cli.dry_run).await?;
            cli::event::run(&ctx, &file).await
        }
        Commands::Regions { action } => {
            let store = cli::open_store(&settings, cli.dry_run).await?;
            match action {
                RegionsAction::Show => cli::regions::show(store.as_ref()).await,
                RegionsAction::Set { regions } => cli::regions::set(store.as_ref(), &regions).await,
            }
        }
        Commands::Status { json } => {
            let store = cli::open_store(&settings, cli.dry_run).await?;
            cli::status::run(store.as_ref(), json).await
        }
        Commands::Init => {
            let store = cli::open_store(&settings, cli.dry_run).await?;
            cli::init::run(store.as_ref(), &config_path).await
        }
        command => match command.job() {
            Some(job) => {
                let ctx = cli::job_context(settings, cli.dry_run).await?;
                cli::once::run(&ctx, job).await
            }
            None => Ok(()),
        },
    }
}
