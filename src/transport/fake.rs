//! In-process fake transport for unit tests
//!
//! [`FakeTransport::new`] returns a `(FakeTransport, FakeTransportHandle)`
//! pair. Wire the transport into the code under test and drive it from the
//! handle:
//!
//! - Read what the client sent: `handle.outbound_rx.recv().await`
//! - Inject lifecycle events and server frames: `handle.open()`,
//!   `handle.frame(json)`, `handle.close(reason)`
//!
//! ```text
//! client send() -----> outbound_tx -----> outbound_rx (handle reads)
//! handle events_tx --> events_tx   -----> events_rx   (client receive())
//! ```

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, Mutex};

use crate::error::{OpschatError, Result};
use crate::transport::{Transport, TransportEvent};

/// In-memory [`Transport`] for tests.
#[derive(Debug)]
pub struct FakeTransport {
    outbound_tx: mpsc::UnboundedSender<String>,
    events_rx: Arc<Mutex<mpsc::UnboundedReceiver<TransportEvent>>>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
}

impl FakeTransport {
    pub fn new() -> (Self, FakeTransportHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let transport = Self {
            outbound_tx,
            events_rx: Arc::new(Mutex::new(events_rx)),
            events_tx: events_tx.clone(),
            closed: Arc::clone(&closed),
        };
        let handle = FakeTransportHandle {
            outbound_rx,
            events_tx,
            closed,
        };
        (transport, handle)
    }
}

/// The test side of a [`FakeTransport`].
#[derive(Debug)]
pub struct FakeTransportHandle {
    /// Frames the client sent via [`Transport::send`].
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
    /// Raw event injection into the client's [`Transport::receive`] stream.
    pub events_tx: mpsc::UnboundedSender<TransportEvent>,
    closed: Arc<AtomicBool>,
}

impl FakeTransportHandle {
    /// Report the connection as established.
    pub fn open(&self) {
        let _ = self.events_tx.send(TransportEvent::Opened);
    }

    /// Deliver a server frame built from a JSON value.
    pub fn frame(&self, value: serde_json::Value) {
        let _ = self.events_tx.send(TransportEvent::Frame(value.to_string()));
    }

    /// Deliver a raw text frame as-is.
    pub fn raw_frame(&self, text: &str) {
        let _ = self.events_tx.send(TransportEvent::Frame(text.to_string()));
    }

    /// Report the connection as lost.
    pub fn close(&self, reason: Option<&str>) {
        let _ = self.events_tx.send(TransportEvent::Closed {
            reason: reason.map(str::to_string),
        });
    }

    /// Whether the client called [`Transport::close`].
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Drain every frame the client has sent so far.
    pub fn sent_frames(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound_rx.try_recv() {
            frames.push(frame);
        }
        frames
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, frame: String) -> Result<()> {
        self.outbound_tx.send(frame).map_err(|e| {
            anyhow::anyhow!(OpschatError::Connection(format!(
                "FakeTransport outbound channel closed: {e}"
            )))
        })
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = TransportEvent> + Send + '_>> {
        let rx = Arc::clone(&self.events_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.events_tx.send(TransportEvent::Closed { reason: None });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_delivers_to_handle() {
        let (transport, mut handle) = FakeTransport::new();
        transport.send("hello".to_string()).await.unwrap();
        assert_eq!(handle.outbound_rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (transport, handle) = FakeTransport::new();
        handle.open();
        handle.raw_frame("one");
        handle.close(Some("bye"));

        let mut stream = transport.receive();
        let mut events = Vec::new();
        for _ in 0..3 {
            let ev = tokio::time::timeout(Duration::from_secs(1), stream.next())
                .await
                .expect("timed out")
                .expect("stream ended");
            events.push(ev);
        }

        assert_eq!(
            events,
            vec![
                TransportEvent::Opened,
                TransportEvent::Frame("one".to_string()),
                TransportEvent::Closed {
                    reason: Some("bye".to_string())
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_close_marks_handle() {
        let (transport, handle) = FakeTransport::new();
        assert!(!handle.was_closed());
        transport.close().await.unwrap();
        assert!(handle.was_closed());
    }

    #[tokio::test]
    async fn test_send_fails_when_handle_dropped() {
        let (transport, handle) = FakeTransport::new();
        drop(handle);
        assert!(transport.send("x".to_string()).await.is_err());
    }

    #[test]
    fn test_fake_transport_is_object_safe() {
        let (transport, _handle) = FakeTransport::new();
        let _boxed: Box<dyn Transport> = Box::new(transport);
    }
}
