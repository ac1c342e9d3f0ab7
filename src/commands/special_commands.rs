//! Special commands parser for the interactive chat REPL
//!
//! Special commands are handled locally instead of being sent to the chat
//! service. They let the user:
//! - List and submit quick queries
//! - Submit a follow-up suggestion from the latest answer
//! - Inspect system status and the message history
//! - Export the session to a file
//! - Exit the session
//!
//! Commands are prefixed with `/` and are case-insensitive. Arguments such
//! as export paths keep their original case.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Display help information
    Help,

    /// List the quick-query catalog with its numbering
    ListQueries,

    /// Submit quick query number N (1-based)
    QuickQuery(usize),

    /// Submit suggestion number N (1-based) of the latest assistant answer
    Suggest(usize),

    /// Show system status
    ShowStatus,

    /// Print the session's messages, or only the last N
    History(Option<usize>),

    /// Write the message log as JSON to a file
    Export(PathBuf),

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent to the chat service as a message.
    None,
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns CommandError::UnknownCommand if input starts with "/" but is not a valid command.
/// Returns CommandError::UnsupportedArgument if a numeric argument is not a positive number.
/// Returns CommandError::MissingArgument if a command requires an argument but none was provided.
///
/// # Examples
///
/// ```
/// use opschat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/q 2").unwrap(), SpecialCommand::QuickQuery(2));
/// assert_eq!(parse_special_command("/suggest 1").unwrap(), SpecialCommand::Suggest(1));
/// assert_eq!(parse_special_command("what is slow?").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    match command.as_str() {
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/queries" => Ok(SpecialCommand::ListQueries),
        "/q" | "/query" => parse_index(&command, arg, "/q <number>").map(SpecialCommand::QuickQuery),
        "/suggest" | "/s" => {
            parse_index(&command, arg, "/suggest <number>").map(SpecialCommand::Suggest)
        }
        "/status" => Ok(SpecialCommand::ShowStatus),
        "/history" if arg.is_empty() => Ok(SpecialCommand::History(None)),
        "/history" => parse_index(&command, arg, "/history [number]")
            .map(|n| SpecialCommand::History(Some(n))),
        "/export" => {
            if arg.is_empty() {
                Err(CommandError::MissingArgument {
                    command: "/export".to_string(),
                    usage: "/export <path>".to_string(),
                })
            } else {
                Ok(SpecialCommand::Export(PathBuf::from(arg)))
            }
        }
        "exit" | "quit" | "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

fn parse_index(command: &str, arg: &str, usage: &str) -> Result<usize, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        });
    }
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::UnsupportedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        }),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

QUICK QUERIES:
  /queries        - List suggested queries, numbered by category
  /q <n>          - Ask quick query number <n>

FOLLOW-UPS:
  /suggest <n>    - Ask suggestion <n> from the latest answer
  /s <n>          - Same as /suggest

SESSION:
  /status         - Show the health of the platform's services
  /history [n]    - Show this session's messages (only the last <n>)
  /export <path>  - Save this session's messages as JSON

OTHER:
  /help           - Show this help message
  /exit           - Exit the chat session (also: exit, quit)

Anything else you type is sent to the chat service.
"#
    );
}
