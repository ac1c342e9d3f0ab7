//! WebSocket transport for the chat channel
//!
//! [`WebSocketTransport::connect`] returns immediately and performs the
//! handshake on a spawned Tokio task. That task then owns the socket:
//! it writes queued outbound frames, forwards inbound text frames, and
//! reports `Opened`/`Closed` through the event queue.
//!
//! # Lifecycle
//!
//! [`Transport::close`] sends a close frame and waits for the task to end.
//! Dropping the transport cancels the task without waiting, so no events are
//! produced for a subscriber that no longer exists.

use std::pin::Pin;
use std::sync::Arc;

use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;

use crate::error::{OpschatError, Result};
use crate::transport::{Transport, TransportEvent};

/// Persistent WebSocket connection to the chat service.
///
/// # Examples
///
/// ```
/// use opschat::transport::websocket::WebSocketTransport;
/// use opschat::transport::Transport;
///
/// # tokio_test::block_on(async {
/// let url = url::Url::parse("ws://127.0.0.1:9/ws/session_1").unwrap();
/// let transport = WebSocketTransport::connect(url);
/// assert_eq!(transport.endpoint().path(), "/ws/session_1");
/// transport.close().await.unwrap();
/// # });
/// ```
#[derive(Debug)]
pub struct WebSocketTransport {
    endpoint: url::Url,
    /// Frames queued by `send()`; drained by the connection task.
    outbound_tx: mpsc::UnboundedSender<String>,
    /// Shared receiver exposed via `receive()`.
    events_rx: Arc<Mutex<mpsc::UnboundedReceiver<TransportEvent>>>,
    cancellation: CancellationToken,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl WebSocketTransport {
    /// Start connecting to `endpoint` in the background.
    ///
    /// Must be called from within a Tokio runtime. No I/O happens on the
    /// caller's task; the outcome arrives as the first event of
    /// [`Transport::receive`].
    pub fn connect(endpoint: url::Url) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancellation = CancellationToken::new();

        let task = tokio::spawn(run_connection(
            endpoint.clone(),
            outbound_rx,
            events_tx,
            cancellation.clone(),
        ));

        Self {
            endpoint,
            outbound_tx,
            events_rx: Arc::new(Mutex::new(events_rx)),
            cancellation,
            task: std::sync::Mutex::new(Some(task)),
        }
    }

    /// The endpoint this transport connects to.
    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, frame: String) -> Result<()> {
        self.outbound_tx.send(frame).map_err(|_| {
            anyhow::anyhow!(OpschatError::Connection(format!(
                "connection to {} is closed",
                self.endpoint
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
        self.cancellation.cancel();
        let task = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(task) = task {
            task.await.map_err(|e| {
                anyhow::anyhow!(OpschatError::Connection(format!(
                    "connection task failed: {e}"
                )))
            })?;
        }
        tracing::debug!(endpoint = %self.endpoint, "WebSocket transport closed");
        Ok(())
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

/// Body of the connection task.
///
/// Always ends by pushing exactly one `Closed` event, unless the event
/// receiver is already gone.
async fn run_connection(
    endpoint: url::Url,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    cancellation: CancellationToken,
) {
    let handshake = tokio::select! {
        _ = cancellation.cancelled() => {
            let _ = events_tx.send(TransportEvent::Closed {
                reason: Some("cancelled before connecting".to_string()),
            });
            return;
        }
        result = tokio_tungstenite::connect_async(endpoint.as_str()) => result,
    };

    let socket = match handshake {
        Ok((socket, _response)) => socket,
        Err(e) => {
            tracing::warn!(endpoint = %endpoint, error = %e, "WebSocket handshake failed");
            let _ = events_tx.send(TransportEvent::Closed {
                reason: Some(e.to_string()),
            });
            return;
        }
    };

    tracing::info!(endpoint = %endpoint, "WebSocket connected");
    if events_tx.send(TransportEvent::Opened).is_err() {
        return;
    }

    let (mut sink, mut stream) = socket.split();

    let reason = loop {
        tokio::select! {
            biased;

            _ = cancellation.cancelled() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                break None;
            }

            outbound = outbound_rx.recv() => match outbound {
                Some(frame) => {
                    if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                        tracing::warn!(endpoint = %endpoint, error = %e, "WebSocket write failed");
                        break Some(e.to_string());
                    }
                }
                None => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break None;
                }
            },

            inbound = stream.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    if events_tx.send(TransportEvent::Frame(text)).is_err() {
                        break None;
                    }
                }
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        if events_tx.send(TransportEvent::Frame(text)).is_err() {
                            break None;
                        }
                    }
                    Err(_) => tracing::warn!(endpoint = %endpoint, "Dropping non-UTF-8 binary frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    break frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                }
                // ping/pong are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "WebSocket read failed");
                    break Some(e.to_string());
                }
                None => break None,
            },
        }
    };

    tracing::info!(endpoint = %endpoint, reason = ?reason, "WebSocket disconnected");
    let _ = events_tx.send(TransportEvent::Closed { reason });
}
