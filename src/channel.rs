//! Transport channel: connection state plus typed chat events
//!
//! A [`Channel`] wraps one [`Transport`] and turns its raw lifecycle and
//! frame events into [`ChannelEvent`]s: `Connected`, `Disconnected`, and
//! decoded inbound messages. It also tracks the connection state that
//! decides whether [`Channel::send`] puts anything on the wire.
//!
//! Events are produced strictly in the order the transport received them.
//! Frames that cannot be decoded are logged and skipped.

use futures::StreamExt;

use crate::error::{OpschatError, Result};
use crate::protocol::{decode_inbound, InboundEvent, OutboundEvent};
use crate::session::SessionId;
use crate::transport::websocket::WebSocketTransport;
use crate::transport::{Transport, TransportEvent};

/// Connection state as last observed through [`Channel::next_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress; nothing has been reported yet
    Connecting,
    Connected,
    Disconnected,
}

/// Typed events surfaced to the chat client.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected,
    /// Connection lost or never established. `reason` carries the failure
    /// or close-frame text when one is known.
    Disconnected { reason: Option<String> },
    Message(InboundEvent),
}

/// Owned connection to the chat service.
#[derive(Debug)]
pub struct Channel {
    transport: Box<dyn Transport>,
    state: ConnectionState,
}

impl Channel {
    /// Start connecting to `endpoint` over WebSocket.
    ///
    /// Returns at once in the [`ConnectionState::Connecting`] state; the
    /// outcome is delivered as the first event from [`Channel::next_event`].
    pub fn connect(endpoint: url::Url) -> Self {
        tracing::debug!(endpoint = %endpoint, "Opening chat channel");
        Self::with_transport(Box::new(WebSocketTransport::connect(endpoint)))
    }

    /// Build a channel over an existing transport.
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Enqueue `event` for delivery.
    ///
    /// Returns `false` without touching the transport when the channel is
    /// not connected, and `false` when the transport rejects the frame.
    /// Neither case is an error for the caller.
    pub async fn send(&self, event: &OutboundEvent) -> bool {
        if !self.is_connected() {
            tracing::debug!(state = ?self.state, "Dropping outbound event on unconnected channel");
            return false;
        }

        let frame = match event.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode outbound event");
                return false;
            }
        };

        match self.transport.send(frame).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send outbound event");
                false
            }
        }
    }

    /// Wait for the next channel event.
    ///
    /// Updates the connection state before returning a lifecycle event.
    /// Returns `None` once the transport has no more events to give.
    ///
    /// This future is cancel-safe: dropping it before it resolves loses no
    /// event.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            let event = self.transport.receive().next().await?;
            match event {
                TransportEvent::Opened => {
                    self.state = ConnectionState::Connected;
                    return Some(ChannelEvent::Connected);
                }
                TransportEvent::Closed { reason } => {
                    self.state = ConnectionState::Disconnected;
                    return Some(ChannelEvent::Disconnected { reason });
                }
                TransportEvent::Frame(text) => match decode_inbound(&text) {
                    Ok(inbound) => return Some(ChannelEvent::Message(inbound)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping undecodable frame");
                    }
                },
            }
        }
    }

    /// Close the connection and release the transport.
    pub async fn disconnect(self) -> Result<()> {
        tracing::debug!(state = ?self.state, "Disconnecting chat channel");
        self.transport.close().await
    }
}

/// WebSocket endpoint for `session` under `ws_base`, i.e.
/// `{ws_base}/ws/{session_id}`.
///
/// # Errors
///
/// Returns [`OpschatError::Config`] when the base is not a `ws`/`wss` URL.
///
/// # Examples
///
/// ```
/// use opschat::channel::session_endpoint;
/// use opschat::session::SessionId;
///
/// let base = url::Url::parse("ws://localhost:8000").unwrap();
/// let url = session_endpoint(&base, &SessionId::new("session_1")).unwrap();
/// assert_eq!(url.as_str(), "ws://localhost:8000/ws/session_1");
/// ```
pub fn session_endpoint(ws_base: &url::Url, session: &SessionId) -> Result<url::Url> {
    if !matches!(ws_base.scheme(), "ws" | "wss") {
        return Err(OpschatError::Config(format!(
            "WebSocket URL must use ws or wss, got {}",
            ws_base.scheme()
        ))
        .into());
    }

    let mut endpoint = ws_base.clone();
    let path = format!("{}/ws/{}", ws_base.path().trim_end_matches('/'), session);
    endpoint.set_path(&path);
    Ok(endpoint)
}
