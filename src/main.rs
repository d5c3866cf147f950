//! autopull - webhook-triggered deployment agent
//!
//! Usage:
//! - `autopull serve` - listen for push notifications and deploy on trigger
//! - `autopull serve --port 19999` - custom listening port
//! - `autopull deploy` - trigger a deployment directly (trusted, no
//!   address check)
//!
//! Configuration comes from `AUTOPULL_*` environment variables; see
//! `config::env`.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use autopull::config::EnvConfig;
use autopull::state::AppState;
use autopull::{DeployError, RequestContext};

#[derive(Parser)]
#[command(name = "autopull", version, about = "Webhook-triggered deployment agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Listen for deployment triggers over HTTP
    Serve {
        /// Override the listening port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Trigger a deployment from the command line (always trusted)
    Deploy,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Error: {}", error);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Serve { port } => serve(config, port).await,
        Command::Deploy => deploy(config).await,
    }
}

async fn serve(config: EnvConfig, port_override: Option<u16>) -> ExitCode {
    let port = port_override.unwrap_or(config.port);

    let state = match AppState::from_env_config(config) {
        Ok(state) => Arc::new(state),
        Err(error) => {
            eprintln!("Error: {}", error);
            return ExitCode::FAILURE;
        }
    };

    if let Err(error) = autopull::run_server(state, port).await {
        eprintln!("Error: {}", error);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn deploy(config: EnvConfig) -> ExitCode {
    let state = match AppState::from_env_config(config) {
        Ok(state) => state,
        Err(error) => {
            eprintln!("Error: {}", error);
            return ExitCode::FAILURE;
        }
    };

    match state.deployer.deploy(&RequestContext::direct()).await {
        Ok(outcome) => {
            println!("{}", outcome.output);
            ExitCode::SUCCESS
        }
        Err(DeployError::Script { output, exit_code }) => {
            eprintln!("{}", output);
            eprintln!(
                "Error: deploy script failed{}",
                exit_code
                    .map(|code| format!(" with exit code {}", code))
                    .unwrap_or_else(|| " to launch".to_string())
            );
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("Error: {}", error);
            ExitCode::FAILURE
        }
    }
}
