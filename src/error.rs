//! Error types for opschat
//!
//! This module defines the error taxonomy used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for opschat operations
///
/// The first three variants are the chat-facing failures. None of them is
/// fatal to the client: connection loss is shown as a banner, backend errors
/// are appended to the message log, and fetch failures leave the previous
/// catalog or status in place.
#[derive(Error, Debug)]
pub enum OpschatError {
    /// The transport channel is disconnected or the handshake failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// The backend reported a failure for a chat exchange
    #[error("Backend error: {0}")]
    Backend(String),

    /// A REST fetch (quick queries, status, health) failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// An inbound frame could not be decoded into a known event
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket protocol errors
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Result type alias for opschat operations
///
/// Uses `anyhow::Error` so callers can attach context while the concrete
/// [`OpschatError`] stays recoverable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
