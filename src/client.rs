//! Chat client: session, channel and message log in one owner
//!
//! [`ChatClient`] is the exchange state machine. It owns the session
//! identifier, the [`Channel`], and the [`MessageLog`], and it is driven by
//! a single task that alternates between user input ([`ChatClient::submit`])
//! and channel events ([`ChatClient::next_event`]).
//!
//! # Exchange state
//!
//! ```text
//! Idle --(non-empty submit while connected)--> AwaitingResponse
//! AwaitingResponse --(response or error event)--> Idle
//! ```
//!
//! Sends are not blocked while a reply is outstanding. Replies carry no
//! correlation ID, so they are matched to sends purely by arrival order;
//! the client only counts how many sends are still unanswered. A
//! disconnect drops that count to zero because replies to a dead socket
//! can never arrive.
//!
//! # Handlers
//!
//! Handlers registered with [`ChatClient::on_connect`],
//! [`ChatClient::on_disconnect`] and [`ChatClient::on_message`] run inside
//! [`ChatClient::next_event`], after the log has been updated, one event at
//! a time in arrival order. Handlers for the same event run in registration
//! order.

use std::fmt;

use crate::channel::{session_endpoint, Channel, ChannelEvent, ConnectionState};
use crate::error::Result;
use crate::message::Message;
use crate::message_log::MessageLog;
use crate::protocol::{ChatRequest, InboundEvent, InboundKind, OutboundEvent, QueryOptions};
use crate::session::{create_session_id, SessionId};

/// Whether any sent message is still waiting for its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    AwaitingResponse,
}

/// Result of a [`ChatClient::submit`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The user message was logged and the `message` event was sent
    Sent,
    /// Empty or whitespace-only input; nothing logged, nothing sent
    Empty,
    /// The channel is not connected; nothing logged, nothing sent
    Disconnected,
    /// The transport rejected the frame; nothing logged
    NotSent,
}

type ConnectHandler = Box<dyn FnMut() + Send>;
type DisconnectHandler = Box<dyn FnMut(Option<&str>) + Send>;
type MessageHandler = Box<dyn FnMut(&Message) + Send>;

#[derive(Default)]
struct EventHandlers {
    connect: Vec<ConnectHandler>,
    disconnect: Vec<DisconnectHandler>,
    response: Vec<MessageHandler>,
    error: Vec<MessageHandler>,
}

/// One chat session against the chat service.
pub struct ChatClient {
    session_id: SessionId,
    channel: Channel,
    log: MessageLog,
    options: QueryOptions,
    outstanding: usize,
    handlers: EventHandlers,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("session_id", &self.session_id)
            .field("connection", &self.channel.state())
            .field("messages", &self.log.len())
            .field("outstanding", &self.outstanding)
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Assemble a client from its parts.
    pub fn new(session_id: SessionId, channel: Channel, options: QueryOptions) -> Self {
        Self {
            session_id,
            channel,
            log: MessageLog::new(),
            options,
            outstanding: 0,
            handlers: EventHandlers::default(),
        }
    }

    /// Create a fresh session and start connecting to
    /// `{ws_base}/ws/{session_id}`.
    ///
    /// Returns before the handshake completes; watch for
    /// [`ChannelEvent::Connected`] from [`ChatClient::next_event`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::OpschatError::Config`] when `ws_base` is not a
    /// WebSocket URL.
    pub fn connect(ws_base: &url::Url, options: QueryOptions) -> Result<Self> {
        let session_id = create_session_id();
        let endpoint = session_endpoint(ws_base, &session_id)?;
        tracing::info!(session_id = %session_id, endpoint = %endpoint, "Starting chat session");
        Ok(Self::new(session_id, Channel::connect(endpoint), options))
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    pub fn state(&self) -> ExchangeState {
        if self.outstanding > 0 {
            ExchangeState::AwaitingResponse
        } else {
            ExchangeState::Idle
        }
    }

    /// Number of sent messages not yet answered.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Run `handler` on every connect event.
    pub fn on_connect(&mut self, handler: impl FnMut() + Send + 'static) {
        self.handlers.connect.push(Box::new(handler));
    }

    /// Run `handler` on every disconnect event with its reason, if any.
    pub fn on_disconnect(&mut self, handler: impl FnMut(Option<&str>) + Send + 'static) {
        self.handlers.disconnect.push(Box::new(handler));
    }

    /// Run `handler` with the logged message for every inbound event of
    /// `kind`.
    pub fn on_message(&mut self, kind: InboundKind, handler: impl FnMut(&Message) + Send + 'static) {
        match kind {
            InboundKind::Response => self.handlers.response.push(Box::new(handler)),
            InboundKind::Error => self.handlers.error.push(Box::new(handler)),
        }
    }

    /// Submit user text.
    ///
    /// Trims `text`; empty input and input while disconnected are refused
    /// without touching the log or the channel. Otherwise the `message`
    /// event is sent and the user message is appended once the transport
    /// accepts it, before any reply can be applied.
    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Empty;
        }
        if !self.channel.is_connected() {
            tracing::debug!(session_id = %self.session_id, "Refusing submit while disconnected");
            return SubmitOutcome::Disconnected;
        }

        let request = ChatRequest::new(text, &self.session_id, &self.options);
        if !self.channel.send(&OutboundEvent::Message(request)).await {
            tracing::warn!(session_id = %self.session_id, "Message not sent");
            return SubmitOutcome::NotSent;
        }

        self.log.append(Message::user(text));
        self.outstanding += 1;
        tracing::debug!(
            session_id = %self.session_id,
            outstanding = self.outstanding,
            "Message sent"
        );
        SubmitOutcome::Sent
    }

    /// Re-submit a follow-up suggestion through the same path as typed text.
    pub async fn submit_suggestion(&mut self, suggestion: &str) -> SubmitOutcome {
        self.submit(suggestion).await
    }

    /// Wait for the next channel event, apply it, and return it.
    ///
    /// Returns `None` when the channel has no more events. Cancel-safe, so it
    /// can sit in a `tokio::select!` next to an input source.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        let event = self.channel.next_event().await?;
        self.apply(&event);
        Some(event)
    }

    /// Close the channel. The log is dropped with the client.
    pub async fn disconnect(self) -> Result<()> {
        tracing::info!(session_id = %self.session_id, messages = self.log.len(), "Ending chat session");
        self.channel.disconnect().await
    }

    fn apply(&mut self, event: &ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                tracing::info!(session_id = %self.session_id, "Chat channel connected");
                for handler in &mut self.handlers.connect {
                    handler();
                }
            }
            ChannelEvent::Disconnected { reason } => {
                if self.outstanding > 0 {
                    tracing::warn!(
                        session_id = %self.session_id,
                        outstanding = self.outstanding,
                        "Disconnected with unanswered messages"
                    );
                }
                self.outstanding = 0;
                for handler in &mut self.handlers.disconnect {
                    handler(reason.as_deref());
                }
            }
            ChannelEvent::Message(inbound) => {
                self.outstanding = self.outstanding.saturating_sub(1);
                let (message, handlers) = match inbound.clone() {
                    InboundEvent::Response(payload) => {
                        (Message::from_response(payload), &mut self.handlers.response)
                    }
                    InboundEvent::Error(payload) => {
                        tracing::warn!(session_id = %self.session_id, error = %payload.error, "Backend reported an error");
                        (Message::from_error(payload), &mut self.handlers.error)
                    }
                };
                self.log.append(message);
                if let Some(logged) = self.log.last() {
                    for handler in handlers.iter_mut() {
                        handler(logged);
                    }
                }
            }
        }
    }
}
