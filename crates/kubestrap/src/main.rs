use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kubestrap_config::parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "kubestrap")]
#[command(about = "Kubestrap - single-node Kubernetes lifecycle tool")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = "kubestrap.yaml")]
    config: PathBuf,

    /// Log debug output, including every command sent to the node
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    Validate,

    /// Bootstrap the control plane with kubeadm init
    Start,

    /// Rebuild control-plane state after a host restart
    Restart,

    /// Stage binaries and configuration and (re)start the kubelet
    Update,

    /// Show kubelet and API server state
    Status,

    /// Print the kubelet journal
    Logs {
        /// Keep streaming new entries
        #[arg(short, long)]
        follow: bool,
    },
}

fn init_logging(verbose: bool, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose {
            "debug"
        } else {
            configured.unwrap_or("info")
        };
        EnvFilter::new(level)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    smol::block_on(async {
        let cli = Cli::parse();

        let config = parser::parse_file(&cli.config)
            .with_context(|| format!("Failed to parse configuration {}", cli.config.display()))?;
        init_logging(cli.verbose, config.settings.log_level.as_deref());

        match cli.command {
            Commands::Validate => commands::validate::run(&cli.config, &config),
            Commands::Start => commands::start::run(&config).await,
            Commands::Restart => commands::restart::run(&config).await,
            Commands::Update => commands::update::run(&config).await,
            Commands::Status => commands::status::run(&config).await,
            Commands::Logs { follow } => commands::logs::run(&config, follow).await,
        }
    })
}
