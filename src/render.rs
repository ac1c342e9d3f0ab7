//! Terminal rendering for the chat REPL and the one-shot commands
//!
//! Everything here returns strings or tables instead of printing so the
//! output can be tested. Colors come from `colored`, which honors the
//! `NO_COLOR` and `CLICOLOR` environment variables.

use colored::Colorize;
use prettytable::{format, row, Table};

use crate::catalog::GroupedQueries;
use crate::channel::ConnectionState;
use crate::message::{Message, MessageKind, MessageMetadata};
use crate::status::SystemStatus;

/// Render one log entry the way the REPL shows it.
///
/// Assistant messages include their data-source counts and numbered
/// follow-up suggestions when present.
pub fn format_message(message: &Message) -> String {
    let time = message.timestamp().format("%H:%M:%S").to_string();
    let time = time.dimmed();

    match message.kind() {
        MessageKind::User => format!("{} {} {}", time, "You:".cyan().bold(), message.content()),
        MessageKind::Error => format!("{} {}", time, message.content().red()),
        MessageKind::Assistant {
            metadata,
            suggestions,
        } => {
            let mut out = format!(
                "{} {} {}",
                time,
                "Assistant:".green().bold(),
                message.content()
            );
            if let Some(line) = metadata.as_ref().and_then(format_metadata) {
                out.push('\n');
                out.push_str(&format!("  {}", line.dimmed()));
            }
            if !suggestions.is_empty() {
                out.push('\n');
                out.push_str(&format_suggestions(suggestions));
            }
            out
        }
    }
}

/// One-line summary of how much data each source contributed, e.g.
/// `Analyzed: metrics 12, logs 40`. `None` when no source is present.
pub fn format_metadata(metadata: &MessageMetadata) -> Option<String> {
    if metadata.is_empty() {
        return None;
    }

    let parts: Vec<String> = [
        ("metrics", metadata.metrics),
        ("logs", metadata.logs),
        ("traces", metadata.traces),
    ]
    .into_iter()
    .filter_map(|(name, summary)| summary.map(|s| format!("{name} {}", s.count)))
    .collect();

    Some(format!("Analyzed: {}", parts.join(", ")))
}

/// Numbered follow-up suggestions, one per line, for `/suggest N`.
pub fn format_suggestions(suggestions: &[String]) -> String {
    let mut out = format!("  {}", "Suggestions:".yellow());
    for (i, suggestion) in suggestions.iter().enumerate() {
        out.push_str(&format!("\n    {}. {}", i + 1, suggestion));
    }
    out
}

/// Banner shown when the connection state changes.
pub fn connection_banner(state: ConnectionState, reason: Option<&str>) -> String {
    match state {
        ConnectionState::Connecting => "Connecting...".yellow().to_string(),
        ConnectionState::Connected => "Connected to chat service".green().bold().to_string(),
        ConnectionState::Disconnected => match reason {
            Some(reason) => format!("Disconnected: {reason}").red().bold().to_string(),
            None => "Disconnected".red().bold().to_string(),
        },
    }
}

/// Quick queries as a numbered table, grouped by category. The numbers
/// match [`GroupedQueries::nth_query`].
pub fn queries_table(grouped: &GroupedQueries) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row![b -> "#", b -> "Category", b -> "Query", b -> "Description"]);

    let mut n = 0;
    for group in grouped.groups() {
        for query in &group.queries {
            n += 1;
            table.add_row(row![n, group.category, query.query, query.description]);
        }
    }
    table
}

/// Per-service health table.
pub fn status_table(status: &SystemStatus) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    table.set_titles(row![b -> "Service", b -> "Status", b -> "Response time"]);

    for (name, health) in &status.services {
        let state = if health.is_healthy() {
            health.status.green().to_string()
        } else {
            health.status.red().to_string()
        };
        let response_time = health
            .response_time
            .map(|t| format!("{:.0} ms", t * 1000.0))
            .or_else(|| health.error.clone())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(row![name, state, response_time]);
    }
    table
}

/// Headline for the overall system state.
pub fn status_headline(status: &SystemStatus) -> String {
    let overall = if status.is_healthy() {
        status.status.green().bold()
    } else {
        status.status.yellow().bold()
    };
    match &status.timestamp {
        Some(ts) => format!("System status: {overall} (as of {ts})"),
        None => format!("System status: {overall}"),
    }
}

/// Short status line for the REPL prompt area.
pub fn status_line(status: Option<&SystemStatus>) -> String {
    match status {
        None => "status unknown".dimmed().to_string(),
        Some(s) if s.is_healthy() => "all services healthy".green().to_string(),
        Some(s) => format!("degraded: {}", s.unhealthy_services().join(", "))
            .yellow()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{group_by_category, QuickQuery};
    use crate::message::SourceSummary;
    use crate::status::ServiceHealth;
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_user_message() {
        let out = format_message(&Message::user("CPU usage?"));
        assert!(out.contains("You:"));
        assert!(out.contains("CPU usage?"));
    }

    #[test]
    fn test_format_error_message_keeps_prefix() {
        let out = format_message(&Message::error("backend timeout", Utc::now()));
        assert!(out.contains("Error: backend timeout"));
    }

    #[test]
    fn test_format_assistant_with_metadata_and_suggestions() {
        let metadata = MessageMetadata {
            metrics: Some(SourceSummary { count: 12 }),
            logs: None,
            traces: Some(SourceSummary { count: 3 }),
        };
        let msg = Message::assistant(
            "CPU at 42%",
            Utc::now(),
            Some(metadata),
            vec!["Show memory".to_string(), "Show errors".to_string()],
        );

        let out = format_message(&msg);
        assert!(out.contains("CPU at 42%"));
        assert!(out.contains("Analyzed: metrics 12, traces 3"));
        assert!(out.contains("1. Show memory"));
        assert!(out.contains("2. Show errors"));
    }

    #[test]
    fn test_format_metadata_empty_is_none() {
        assert!(format_metadata(&MessageMetadata::default()).is_none());
    }

    #[test]
    fn test_connection_banner_includes_reason() {
        let banner = connection_banner(ConnectionState::Disconnected, Some("connection refused"));
        assert!(banner.contains("connection refused"));
    }

    #[test]
    fn test_queries_table_numbers_follow_grouping() {
        let q = |query: &str, category: &str| QuickQuery {
            query: query.to_string(),
            category: category.to_string(),
            description: String::new(),
        };
        let grouped = group_by_category(vec![q("a", "x"), q("b", "y"), q("c", "x")]);
        let rendered = queries_table(&grouped).to_string();

        let a = rendered.find(" a ").unwrap();
        let c = rendered.find(" c ").unwrap();
        let b = rendered.find(" b ").unwrap();
        assert!(a < c && c < b);
        assert_eq!(grouped.nth_query(2).unwrap().query, "c");
    }

    #[test]
    fn test_status_line_lists_unhealthy_services() {
        let mut services = BTreeMap::new();
        services.insert(
            "prometheus".to_string(),
            ServiceHealth {
                status: "unreachable".to_string(),
                response_time: None,
                status_code: None,
                error: Some("connection refused".to_string()),
            },
        );
        let status = SystemStatus {
            status: "degraded".to_string(),
            services,
            timestamp: None,
        };

        assert!(status_line(Some(&status)).contains("prometheus"));
        assert!(status_table(&status).to_string().contains("connection refused"));
        assert!(status_line(None).contains("unknown"));
    }
}
