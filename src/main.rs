//! opschat - terminal chat client for the observability platform
//!
#![doc = "opschat - terminal chat client for the observability platform"]
#![doc = "Main entry point for the opschat CLI."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use opschat::cli::{Cli, Commands};
use opschat::commands;
use opschat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/opschat.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { .. } => {
            tracing::info!("Starting interactive chat");
            tracing::debug!(
                time_range = %config.chat.time_range,
                metrics = config.chat.include_metrics,
                logs = config.chat.include_logs,
                traces = config.chat.include_traces,
                "Using data selection"
            );

            // Moves `config` into the handler (match arms are exclusive)
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Queries { json } => {
            tracing::info!("Fetching quick queries");
            commands::queries::run_queries(&config, json).await?;
            Ok(())
        }
        Commands::Status { json } => {
            tracing::info!("Fetching system status");
            commands::status::run_status(&config, json).await?;
            Ok(())
        }
        Commands::Ask { message, json, .. } => {
            tracing::info!("Sending one-shot question");
            commands::ask::run_ask(&config, &message, json).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so they never mix with `--json` output on stdout.
fn init_tracing(verbose: bool, json_logs: bool) {
    let env_filter = if verbose {
        EnvFilter::new("opschat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("opschat=info"))
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
