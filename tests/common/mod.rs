use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::Path;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;

use opschat::channel::ChannelEvent;
use opschat::ChatClient;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("opschat.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// A URL on localhost that refuses connections.
#[allow(dead_code)]
pub async fn unused_local_url(scheme: &str) -> url::Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    url::Url::parse(&format!("{scheme}://127.0.0.1:{port}")).expect("valid url")
}

/// Start an in-process chat server on `/ws/:session_id` and return its
/// WebSocket base URL.
///
/// For every `message` event it receives the server answers:
/// - `fail` with an `error` event whose text is `backend timeout`
/// - `bye` by closing the socket with reason `server closing`
/// - anything else with a `response` event `[<session_id>] <message>`
///   carrying metadata and two suggestions
#[allow(dead_code)]
pub async fn spawn_chat_server() -> url::Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = Router::new().route("/ws/:session_id", get(ws_handler));

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("chat server failed");
    });

    url::Url::parse(&format!("ws://{addr}")).expect("valid url")
}

async fn ws_handler(ws: WebSocketUpgrade, Path(session_id): Path<String>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_session(socket, session_id))
}

async fn serve_session(mut socket: WebSocket, session_id: String) {
    while let Some(Ok(frame)) = socket.recv().await {
        let WsMessage::Text(text) = frame else {
            continue;
        };
        let Ok(event) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let message = event["message"].as_str().unwrap_or_default().to_string();

        let reply = match message.as_str() {
            "fail" => json!({
                "type": "error",
                "error": "backend timeout",
                "timestamp": "2024-01-01T00:00:01.000000"
            }),
            "bye" => {
                let _ = socket
                    .send(WsMessage::Close(Some(CloseFrame {
                        code: 1000,
                        reason: "server closing".into(),
                    })))
                    .await;
                return;
            }
            _ => json!({
                "type": "response",
                "response": format!("[{session_id}] {message}"),
                "metadata": {"metrics": {"count": 3}, "logs": {"count": 7}},
                "suggestions": ["Show more detail", "Compare with last week"],
                "timestamp": "2024-01-01T00:00:00.000000"
            }),
        };

        if socket.send(WsMessage::Text(reply.to_string())).await.is_err() {
            return;
        }
    }
}

/// Next client event, failing the test after a few seconds.
#[allow(dead_code)]
pub async fn next_event(client: &mut ChatClient) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), client.next_event())
        .await
        .expect("timed out waiting for event")
        .expect("channel ended")
}
