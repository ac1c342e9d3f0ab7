//! Chat transport abstraction and implementations
//!
//! This module defines the [`Transport`] trait that carries raw text frames
//! between the client and the chat service. Concrete implementations live
//! in submodules:
//!
//! - [`websocket::WebSocketTransport`] -- persistent WebSocket connection
//!   driven by a background Tokio task.
//! - [`fake::FakeTransport`] -- in-process fake used in tests (cfg(test)
//!   only).
//!
//! # Design
//!
//! Connection lifecycle is reported in-band: the [`Transport::receive`]
//! stream yields [`TransportEvent::Opened`] once the connection is usable,
//! one [`TransportEvent::Frame`] per inbound text message, and a final
//! [`TransportEvent::Closed`] when the connection ends for any reason.
//! Decoding frames into chat events is the job of
//! [`crate::channel::Channel`], not of the transport.

use std::pin::Pin;

use futures::Stream;

use crate::error::Result;

/// Lifecycle and data events produced by a transport, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and frames may be sent
    Opened,
    /// One complete inbound text frame
    Frame(String),
    /// The connection ended; `reason` is set for failures and close frames
    /// that carried one
    Closed { reason: Option<String> },
}

/// Abstraction over chat transports.
///
/// All methods are `async` or return pinned [`Stream`]s so implementations
/// can drive I/O without blocking the Tokio executor.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Queue one text frame for delivery to the server.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::OpschatError::Connection`] if the connection
    /// task has already shut down.
    async fn send(&self, frame: String) -> Result<()>;

    /// Returns the stream of transport events.
    ///
    /// Every call returns a view over the same underlying queue, so events
    /// are never duplicated across calls. The stream ends once the transport
    /// has been dropped or its event source is gone.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = TransportEvent> + Send + '_>>;

    /// Close the connection and wait for the I/O task to finish.
    async fn close(&self) -> Result<()>;
}

pub mod websocket;

#[cfg(test)]
pub mod fake;
