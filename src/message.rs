//! Chat messages held by the message log
//!
//! A [`Message`] is one of three kinds: what the user typed, what the
//! assistant answered, or an error the backend reported. Only assistant
//! messages carry analysis metadata and follow-up suggestions. Messages are
//! immutable once built; every field is read through an accessor.

use std::fmt;
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::{Generator, Ulid};

use crate::protocol::{parse_timestamp, ErrorPayload, ResponsePayload};

/// Content used when the backend answers with a `null` response.
pub const EMPTY_RESPONSE_TEXT: &str = "No response available";

/// Unique message identifier.
///
/// Identifiers come from a process-wide monotonic ULID generator, so two
/// messages created within the same millisecond still get distinct IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Ulid);

impl MessageId {
    /// Allocate the next identifier.
    pub fn generate() -> Self {
        static GENERATOR: OnceLock<Mutex<Generator>> = OnceLock::new();
        let generator = GENERATOR.get_or_init(|| Mutex::new(Generator::new()));
        let next = match generator.lock() {
            Ok(mut guard) => guard.generate().unwrap_or_else(|_| Ulid::new()),
            Err(_) => Ulid::new(),
        };
        Self(next)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of data points one source contributed to an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceSummary {
    #[serde(default)]
    pub count: u64,
}

/// Analysis metadata attached to an assistant answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SourceSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<SourceSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces: Option<SourceSummary>,
}

impl MessageMetadata {
    /// True when none of the three sections is present.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_none() && self.logs.is_none() && self.traces.is_none()
    }
}

/// The closed set of message kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageKind {
    /// Text the user submitted
    User,
    /// An answer from the assistant
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<MessageMetadata>,
        #[serde(default)]
        suggestions: Vec<String>,
    },
    /// A failure the backend reported for an exchange
    Error,
}

impl MessageKind {
    /// Short lowercase label: `user`, `assistant` or `error`.
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Assistant { .. } => "assistant",
            MessageKind::Error => "error",
        }
    }
}

/// One entry of the message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    #[serde(flatten)]
    kind: MessageKind,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// A message the user submitted now.
    ///
    /// # Examples
    ///
    /// ```
    /// use opschat::message::Message;
    ///
    /// let msg = Message::user("What are the current issues?");
    /// assert!(msg.is_user());
    /// assert!(msg.suggestions().is_empty());
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            kind: MessageKind::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// An assistant answer with explicit fields.
    pub fn assistant(
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
        metadata: Option<MessageMetadata>,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            kind: MessageKind::Assistant {
                metadata,
                suggestions,
            },
            content: content.into(),
            timestamp,
        }
    }

    /// An error entry. `description` is shown after an `Error: ` prefix.
    pub fn error(description: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            kind: MessageKind::Error,
            content: format!("Error: {description}"),
            timestamp,
        }
    }

    /// Build the assistant message for an inbound `response` event.
    pub fn from_response(payload: ResponsePayload) -> Self {
        let timestamp = payload
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        Self::assistant(
            payload
                .response
                .unwrap_or_else(|| EMPTY_RESPONSE_TEXT.to_string()),
            timestamp,
            payload.metadata,
            payload.suggestions.unwrap_or_default(),
        )
    }

    /// Build the error message for an inbound `error` event.
    pub fn from_error(payload: ErrorPayload) -> Self {
        let timestamp = payload
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        Self::error(&payload.error, timestamp)
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Analysis metadata; always `None` for user and error messages.
    pub fn metadata(&self) -> Option<&MessageMetadata> {
        match &self.kind {
            MessageKind::Assistant { metadata, .. } => metadata.as_ref(),
            _ => None,
        }
    }

    /// Follow-up suggestions; always empty for user and error messages.
    pub fn suggestions(&self) -> &[String] {
        match &self.kind {
            MessageKind::Assistant { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self.kind, MessageKind::User)
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self.kind, MessageKind::Assistant { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, MessageKind::Error)
    }
}
