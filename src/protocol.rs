//! Wire format of the chat channel
//!
//! Every WebSocket frame carries one JSON object. Frames sent by the client
//! are tagged `"type": "message"`. The server answers with frames tagged
//! `"response"` or `"error"`. Frames without a `type` are classified by
//! shape: an `error` key makes an error event, a `response` key makes a
//! response event.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OpschatError, Result};
use crate::message::MessageMetadata;
use crate::session::SessionId;

/// Per-exchange data selection sent along with every message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Ask the backend to consult metrics
    pub include_metrics: bool,
    /// Ask the backend to consult logs
    pub include_logs: bool,
    /// Ask the backend to consult traces
    pub include_traces: bool,
    /// Look-back window, e.g. `15m`, `1h`, `7d`
    pub time_range: String,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            include_metrics: true,
            include_logs: true,
            include_traces: true,
            time_range: "1h".to_string(),
        }
    }
}

/// Payload of the outbound `message` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User text, already trimmed
    pub message: String,
    /// Session the message belongs to
    pub session_id: SessionId,
    pub include_metrics: bool,
    pub include_logs: bool,
    pub include_traces: bool,
    pub time_range: String,
}

impl ChatRequest {
    /// Build a request for `message` using the session and data selection.
    ///
    /// # Examples
    ///
    /// ```
    /// use opschat::protocol::{ChatRequest, QueryOptions};
    /// use opschat::session::SessionId;
    ///
    /// let req = ChatRequest::new("CPU usage?", &SessionId::new("session_1"), &QueryOptions::default());
    /// assert_eq!(req.time_range, "1h");
    /// assert!(req.include_traces);
    /// ```
    pub fn new(message: impl Into<String>, session_id: &SessionId, options: &QueryOptions) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.clone(),
            include_metrics: options.include_metrics,
            include_logs: options.include_logs,
            include_traces: options.include_traces,
            time_range: options.time_range.clone(),
        }
    }
}

/// Events the client emits on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// A user message for the assistant
    Message(ChatRequest),
}

impl OutboundEvent {
    /// Serialize the event into a single text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Payload of an inbound `response` event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// Assistant answer; the server sends `null` when the processor had none
    #[serde(default)]
    pub response: Option<String>,
    /// Server-side timestamp, ISO-8601 with or without an offset
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub metadata: Option<MessageMetadata>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
}

/// Payload of an inbound `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable failure description
    pub error: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Sub-kinds of an incoming channel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundKind {
    Response,
    Error,
}

/// A decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Response(ResponsePayload),
    Error(ErrorPayload),
}

impl InboundEvent {
    /// Which handler family this event is dispatched to.
    pub fn kind(&self) -> InboundKind {
        match self {
            InboundEvent::Response(_) => InboundKind::Response,
            InboundEvent::Error(_) => InboundKind::Error,
        }
    }
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// Returns [`OpschatError::Protocol`] when the frame is not a JSON object,
/// carries an unknown `type`, or has neither a `response` nor an `error`
/// key. Returns [`OpschatError::Serialization`] when a known payload has
/// the wrong field types.
///
/// # Examples
///
/// ```
/// use opschat::protocol::{decode_inbound, InboundKind};
///
/// let ev = decode_inbound(r#"{"type":"error","error":"backend timeout"}"#).unwrap();
/// assert_eq!(ev.kind(), InboundKind::Error);
/// ```
pub fn decode_inbound(frame: &str) -> Result<InboundEvent> {
    let value: serde_json::Value = serde_json::from_str(frame).map_err(OpschatError::from)?;
    let object = value
        .as_object()
        .ok_or_else(|| OpschatError::Protocol("frame is not a JSON object".to_string()))?;

    let kind = match object.get("type").and_then(|t| t.as_str()) {
        Some("response") => InboundKind::Response,
        Some("error") => InboundKind::Error,
        Some(other) => {
            return Err(OpschatError::Protocol(format!("unknown event type: {other}")).into())
        }
        None if object.contains_key("error") => InboundKind::Error,
        None if object.contains_key("response") => InboundKind::Response,
        None => {
            return Err(
                OpschatError::Protocol("frame has no type, response or error".to_string()).into(),
            )
        }
    };

    let event = match kind {
        InboundKind::Response => {
            InboundEvent::Response(serde_json::from_value(value).map_err(OpschatError::from)?)
        }
        InboundKind::Error => {
            InboundEvent::Error(serde_json::from_value(value).map_err(OpschatError::from)?)
        }
    };
    Ok(event)
}

/// Parse a server timestamp.
///
/// Accepts RFC 3339 (`2024-01-01T00:00:00Z`) and the naive form the chat
/// service emits (`2024-01-01T00:00:00.123456`), which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
