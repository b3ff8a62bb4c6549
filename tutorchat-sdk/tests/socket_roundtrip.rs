//! Transport tests against a real local WebSocket server.
//!
//! Covers: envelope send/receive over an actual socket, orderly close,
//! automatic reconnection after an unexpected drop, and the give-up path
//! when nothing is listening.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use tutorchat_sdk::event::SocketEvent;
use tutorchat_sdk::reconnect::{self, ReconnectConfig};
use tutorchat_sdk::socket;
use tutorchat_sdk::wire::Envelope;

#[tokio::test]
async fn socket_sends_and_receives_envelopes() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        // Answer the first text frame with an ACK for its token, then close.
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                let env: Envelope = serde_json::from_str(text.as_str()).unwrap();
                let ack = Envelope {
                    kind: "ACK".to_string(),
                    data: serde_json::Value::Null,
                    timestamp: None,
                    message_id: env.message_id,
                };
                ws.send(Message::Text(serde_json::to_string(&ack).unwrap().into()))
                    .await
                    .unwrap();
                break;
            }
        }
        ws.close(None).await.ok();
    });

    let (handle, mut events) = socket::connect(&format!("ws://{addr}")).await.unwrap();
    assert!(matches!(events.recv().await, Some(SocketEvent::Opened)));

    let out = Envelope::outbound(
        "CHAT_MESSAGE",
        serde_json::json!({"content": "hi"}),
        "1".to_string(),
    );
    handle
        .send_text(serde_json::to_string(&out).unwrap())
        .await
        .unwrap();

    match events.recv().await {
        Some(SocketEvent::Message(env)) => {
            assert_eq!(env.kind, "ACK");
            assert_eq!(env.message_id.as_deref(), Some("1"));
        }
        other => panic!("expected ACK envelope, got {other:?}"),
    }

    match events.recv().await {
        Some(SocketEvent::Closed { .. }) => {}
        other => panic!("expected Closed, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn reconnects_after_unexpected_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        // First connection: accept, then drop without a close handshake.
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        drop(ws);
        // Second connection: stay up until the client closes.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let cfg = ReconnectConfig {
        backoff: vec![Duration::from_millis(10)],
        max_attempts: Some(5),
    };
    let (handle, mut events) = reconnect::open(format!("ws://{addr}"), cfg);

    assert!(matches!(events.recv().await, Some(SocketEvent::Opened)));
    // The drop shows up as Closed (EOF) or Failed depending on how the
    // runtime observes the reset; both must trigger a reconnect.
    match events.recv().await.unwrap() {
        SocketEvent::Closed { .. } | SocketEvent::Failed { .. } => {}
        other => panic!("expected disconnect, got {other:?}"),
    }
    assert!(matches!(events.recv().await, Some(SocketEvent::Opened)));
    assert!(handle.is_connected());

    handle.close().await;
}

#[tokio::test]
async fn gives_up_when_nothing_listens() {
    let cfg = ReconnectConfig {
        backoff: vec![Duration::from_millis(10)],
        max_attempts: Some(2),
    };
    let (handle, mut events) = reconnect::open("ws://127.0.0.1:9".to_string(), cfg);

    let mut failures = 0;
    loop {
        match events.recv().await {
            Some(SocketEvent::Failed { .. }) => failures += 1,
            Some(SocketEvent::GaveUp { attempts }) => {
                assert_eq!(attempts, 2);
                break;
            }
            other => panic!("expected Failed/GaveUp, got {other:?}"),
        }
    }
    // Initial attempt plus two retries.
    assert_eq!(failures, 3);
    assert!(!handle.is_connected());
    assert!(handle.send("x".to_string()).await.is_err());
}
