//! Chat session integration tests
//!
//! Drives a real `ChatClient` over the WebSocket transport against an
//! in-process axum chat server (see `common::spawn_chat_server`).

use std::sync::{Arc, Mutex};

use opschat::channel::{ChannelEvent, ConnectionState};
use opschat::protocol::{InboundKind, QueryOptions};
use opschat::{ChatClient, ExchangeState, SubmitOutcome};

mod common;

async fn connected_client() -> ChatClient {
    let ws_base = common::spawn_chat_server().await;
    let mut client = ChatClient::connect(&ws_base, QueryOptions::default()).expect("connect");
    assert_eq!(common::next_event(&mut client).await, ChannelEvent::Connected);
    client
}

/// A submitted message is answered with one assistant entry.
#[tokio::test]
async fn test_submit_and_receive_response() {
    let mut client = connected_client().await;

    assert_eq!(client.submit("CPU usage?").await, SubmitOutcome::Sent);
    assert_eq!(client.state(), ExchangeState::AwaitingResponse);

    let event = common::next_event(&mut client).await;
    assert!(matches!(event, ChannelEvent::Message(_)));
    assert_eq!(client.state(), ExchangeState::Idle);

    let log = client.log().all();
    assert_eq!(log.len(), 2);
    assert!(log[0].is_user());
    assert_eq!(log[0].content(), "CPU usage?");
    assert!(log[1].is_assistant());

    // The server echoes the session id taken from the URL path.
    let expected = format!("[{}] CPU usage?", client.session_id());
    assert_eq!(log[1].content(), expected);

    let metadata = log[1].metadata().expect("metadata");
    assert_eq!(metadata.metrics.map(|m| m.count), Some(3));
    assert_eq!(metadata.logs.map(|m| m.count), Some(7));
    assert!(metadata.traces.is_none());
    assert_eq!(log[1].suggestions().len(), 2);

    client.disconnect().await.expect("disconnect");
}

/// An `error` event is logged as an error entry with the `Error: ` prefix.
#[tokio::test]
async fn test_backend_error_event() {
    let mut client = connected_client().await;

    client.submit("fail").await;
    common::next_event(&mut client).await;

    let last = client.log().last().expect("entry");
    assert!(last.is_error());
    assert_eq!(last.content(), "Error: backend timeout");
    assert_eq!(client.state(), ExchangeState::Idle);

    client.disconnect().await.expect("disconnect");
}

/// Several sends in a row are answered in order.
#[tokio::test]
async fn test_replies_arrive_in_send_order() {
    let mut client = connected_client().await;

    for text in ["first", "second", "third"] {
        client.submit(text).await;
    }
    assert_eq!(client.outstanding(), 3);

    for _ in 0..3 {
        common::next_event(&mut client).await;
    }

    let answers: Vec<String> = client
        .log()
        .all()
        .iter()
        .filter(|m| m.is_assistant())
        .map(|m| m.content().to_string())
        .collect();
    let prefix = format!("[{}] ", client.session_id());
    assert_eq!(
        answers,
        vec![
            format!("{prefix}first"),
            format!("{prefix}second"),
            format!("{prefix}third"),
        ]
    );
    assert_eq!(client.outstanding(), 0);

    client.disconnect().await.expect("disconnect");
}

/// A follow-up suggestion goes through the same send path as typed text.
#[tokio::test]
async fn test_suggestion_round_trip() {
    let mut client = connected_client().await;

    client.submit("latency?").await;
    common::next_event(&mut client).await;

    let suggestion = client.log().last_assistant().expect("answer").suggestions()[0].clone();
    assert_eq!(
        client.submit_suggestion(&suggestion).await,
        SubmitOutcome::Sent
    );
    common::next_event(&mut client).await;

    let contents: Vec<&str> = client.log().all().iter().map(|m| m.content()).collect();
    assert_eq!(contents[2], "Show more detail");
    assert!(contents[3].ends_with("Show more detail"));

    client.disconnect().await.expect("disconnect");
}

/// A server-side close surfaces as a disconnect and stops further sends.
#[tokio::test]
async fn test_server_close_disconnects_client() {
    let mut client = connected_client().await;
    let reasons = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&reasons);
    client.on_disconnect(move |reason| seen.lock().unwrap().push(reason.map(str::to_string)));

    client.submit("bye").await;
    let event = common::next_event(&mut client).await;

    assert_eq!(
        event,
        ChannelEvent::Disconnected {
            reason: Some("server closing".to_string())
        }
    );
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert_eq!(client.state(), ExchangeState::Idle);
    assert_eq!(
        *reasons.lock().unwrap(),
        vec![Some("server closing".to_string())]
    );

    let before = client.log().len();
    assert_eq!(client.submit("anyone?").await, SubmitOutcome::Disconnected);
    assert_eq!(client.log().len(), before);
}

/// Connecting to a dead endpoint reports a disconnect instead of failing.
#[tokio::test]
async fn test_connection_refused_is_reported_as_disconnect() {
    let ws_base = common::unused_local_url("ws").await;
    let mut client = ChatClient::connect(&ws_base, QueryOptions::default()).expect("connect");
    assert_eq!(client.connection_state(), ConnectionState::Connecting);

    match common::next_event(&mut client).await {
        ChannelEvent::Disconnected { reason } => assert!(reason.is_some()),
        other => panic!("expected Disconnected, got {other:?}"),
    }
    assert_eq!(client.submit("hello").await, SubmitOutcome::Disconnected);
    assert!(client.log().is_empty());
}

/// Response handlers see each answer once, in arrival order.
#[tokio::test]
async fn test_message_handlers_fire_per_answer() {
    let mut client = connected_client().await;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    client.on_message(InboundKind::Response, move |m| {
        s.lock().unwrap().push(m.content().to_string())
    });
    let s = Arc::clone(&seen);
    client.on_message(InboundKind::Error, move |m| {
        s.lock().unwrap().push(m.content().to_string())
    });

    client.submit("one").await;
    client.submit("fail").await;
    common::next_event(&mut client).await;
    common::next_event(&mut client).await;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].ends_with("one"));
    assert_eq!(seen[1], "Error: backend timeout");

    client.disconnect().await.expect("disconnect");
}

/// Log subscribers are notified on every append.
#[tokio::test]
async fn test_log_subscription_tracks_appends() {
    let mut client = connected_client().await;
    let mut changes = client.log().subscribe();

    client.submit("disk?").await;
    assert!(changes.has_changed().unwrap());
    assert_eq!(*changes.borrow_and_update(), 1);

    common::next_event(&mut client).await;
    assert!(changes.has_changed().unwrap());
    assert_eq!(*changes.borrow_and_update(), 2);

    client.disconnect().await.expect("disconnect");
}
