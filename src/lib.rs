//! opschat - terminal client for the observability platform's chat service
//!
//! This library provides the client side of a real-time chat with the
//! platform: a session identifier, a persistent WebSocket channel, an
//! ordered message log, and the quick-query catalog.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Session identifiers
//! - `transport`: Frame transport abstraction and the WebSocket implementation
//! - `protocol`: Wire events exchanged over the channel
//! - `channel`: Connection state and typed chat events
//! - `client`: The chat exchange state machine that owns the message log
//! - `message` / `message_log`: Message model and append-only log
//! - `api`, `catalog`, `status`: REST surface, quick queries, system status
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`, `commands`, `render`: Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use opschat::{ChatClient, Config};
//! use opschat::channel::ChannelEvent;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/opschat.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let mut client = ChatClient::connect(&config.ws_base_url()?, config.query_options())?;
//!     while let Some(event) = client.next_event().await {
//!         if event == ChannelEvent::Connected {
//!             client.submit("What is the current error rate?").await;
//!         }
//!         if matches!(event, ChannelEvent::Message(_) | ChannelEvent::Disconnected { .. }) {
//!             break;
//!         }
//!     }
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod channel;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod message;
pub mod message_log;
pub mod protocol;
pub mod render;
pub mod session;
pub mod status;
pub mod transport;

// Re-export commonly used types
pub use api::ApiClient;
pub use catalog::{group_by_category, GroupedQueries, QuickQuery, QuickQueryCatalog};
pub use client::{ChatClient, ExchangeState, SubmitOutcome};
pub use config::Config;
pub use error::{OpschatError, Result};
pub use message::{Message, MessageKind};
pub use message_log::MessageLog;
pub use session::{create_session_id, SessionId};
pub use status::StatusPoller;
