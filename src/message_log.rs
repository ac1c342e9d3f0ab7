//! Ordered, append-only message log
//!
//! The log is owned by one chat client. Entries are never edited or
//! removed; order is append order. Subscribers get a `watch` notification
//! carrying the new length after every append; pair it with
//! [`MessageLog::since`] to read only the new entries.

use tokio::sync::watch;

use crate::error::Result;
use crate::message::Message;

/// Append-only sequence of [`Message`]s.
///
/// # Examples
///
/// ```
/// use opschat::message::Message;
/// use opschat::message_log::MessageLog;
///
/// let mut log = MessageLog::new();
/// log.append(Message::user("Show me slow requests"));
/// assert_eq!(log.len(), 1);
/// assert_eq!(log.all()[0].content(), "Show me slow requests");
/// ```
#[derive(Debug)]
pub struct MessageLog {
    messages: Vec<Message>,
    changed: watch::Sender<usize>,
}

impl MessageLog {
    pub fn new() -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            messages: Vec::new(),
            changed,
        }
    }

    /// Append `message` at the end and notify subscribers.
    pub fn append(&mut self, message: Message) {
        tracing::trace!(id = %message.id(), kind = message.kind().label(), "Appending message");
        self.messages.push(message);
        // send_replace never fails, even with no live receivers
        self.changed.send_replace(self.messages.len());
    }

    /// All messages in append order.
    ///
    /// The returned slice is a read-only view; iterating it any number of
    /// times has no side effects.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Messages appended after the first `index` entries.
    ///
    /// Returns an empty slice when `index` is at or beyond the end.
    pub fn since(&self, index: usize) -> &[Message] {
        self.messages.get(index..).unwrap_or(&[])
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent assistant message, if any.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_assistant())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Subscribe to log-changed notifications.
    ///
    /// The receiver holds the current length; `changed().await` resolves
    /// after the next append.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.changed.subscribe()
    }

    /// Serialize the full transcript as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.messages)?)
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}
