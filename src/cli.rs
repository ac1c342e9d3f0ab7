//! Command-line interface definition for opschat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the interactive chat REPL and the one-shot catalog, status and
//! ask commands.

use clap::{Args, Parser, Subcommand};

/// opschat - chat with your observability platform from the terminal
///
/// Ask questions about metrics, logs and traces over a live connection to
/// the platform's chat service.
#[derive(Parser, Debug, Clone)]
#[command(name = "opschat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/opschat.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Override the chat service base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Data selection flags shared by `chat` and `ask`
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryArgs {
    /// Look-back window for the analysis (e.g. 15m, 1h, 7d)
    #[arg(short, long)]
    pub time_range: Option<String>,

    /// Do not consult metrics
    #[arg(long)]
    pub no_metrics: bool,

    /// Do not consult logs
    #[arg(long)]
    pub no_logs: bool,

    /// Do not consult traces
    #[arg(long)]
    pub no_traces: bool,
}

/// Available commands for opschat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat session
    Chat {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// List the suggested quick queries, grouped by category
    Queries {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the health of the platform's services
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Ask a single question without opening a chat session
    Ask {
        /// The question to ask
        #[arg(value_parser = parse_message)]
        message: String,

        #[command(flatten)]
        query: QueryArgs,

        /// Print the raw reply as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Reject questions that are empty once trimmed.
fn parse_message(raw: &str) -> Result<String, String> {
    let message = raw.trim();
    if message.is_empty() {
        return Err("message cannot be empty".to_string());
    }
    Ok(message.to_string())
}

impl Commands {
    /// Data selection flags carried by this command, if any.
    pub fn query_args(&self) -> Option<&QueryArgs> {
        match self {
            Commands::Chat { query } | Commands::Ask { query, .. } => Some(query),
            Commands::Queries { .. } | Commands::Status { .. } => None,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/opschat.yaml".to_string()),
            verbose: false,
            json_logs: false,
            api_url: None,
            command: Commands::Chat {
                query: QueryArgs::default(),
            },
        }
    }
}
