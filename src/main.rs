use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tabspaces::cli;

#[derive(Parser)]
#[command(name = "tabspaces", about = "Workspace-tab reconciliation engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show workspaces, tab counts and the switch guard from the state file.
    Status {
        /// Path to config file (TOML).
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// List the saved tabs of one workspace (by id or name).
    Tabs {
        /// Workspace id or name.
        workspace: String,
        /// Path to config file (TOML).
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Clear a switch guard left behind by a crash mid-switch.
    ReleaseGuard {
        /// Path to config file (TOML).
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// Verify config and state file health. Exits 0 if all pass.
    Check {
        /// Path to config file (TOML).
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status { config: config_path } => {
            let config = cli::load_config(config_path)?;
            cli::run_status(&config).await?;
        }
        Commands::Tabs { workspace, config: config_path } => {
            let config = cli::load_config(config_path)?;
            cli::run_tabs(&config, &workspace).await?;
        }
        Commands::ReleaseGuard { config: config_path } => {
            let config = cli::load_config(config_path)?;
            cli::run_release_guard(&config).await?;
        }
        Commands::Check { config: config_path } => {
            let config = cli::load_config(config_path)?;
            cli::run_check(&config).await?;
        }
    }
    Ok(())
}
