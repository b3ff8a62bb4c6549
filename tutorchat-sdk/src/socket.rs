//! Single-connection WebSocket transport.
//!
//! One [`connect`] call owns one physical socket. The protocol loop runs in
//! a spawned task: inbound frames are parsed and forwarded on the event
//! channel in arrival order, outbound sends arrive over a command channel.
//! Reconnection lives one layer up, in [`crate::reconnect`].

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::SdkError;
use crate::event::SocketEvent;
use crate::wire::Envelope;

/// Commands the consumer can send to the socket task.
#[derive(Debug)]
enum Command {
    Send(String),
    Close,
}

/// Handle to a live socket. Cheap to clone; all clones address the same
/// connection. Dropping every clone closes the socket.
#[derive(Clone)]
pub struct SocketHandle {
    cmd_tx: mpsc::Sender<Command>,
}

impl SocketHandle {
    /// Queue one text frame for transmission.
    ///
    /// An `Ok` here means the frame was handed to the socket task, not that
    /// the peer received it; write failures surface as a
    /// [`SocketEvent::Failed`] on the event channel.
    pub async fn send_text(&self, text: String) -> Result<(), SdkError> {
        self.cmd_tx
            .send(Command::Send(text))
            .await
            .map_err(|_| SdkError::NotConnected)
    }

    /// Close the socket with a normal close frame.
    pub async fn close(&self) {
        let _ = self.cmd_tx.send(Command::Close).await;
    }
}

/// Connect to `endpoint` and spawn the protocol loop.
///
/// Handshake failures are returned directly so the caller can decide whether
/// to retry; after this returns `Ok`, everything else arrives as events.
pub async fn connect(
    endpoint: &str,
) -> Result<(SocketHandle, mpsc::Receiver<SocketEvent>), SdkError> {
    let (ws, _response) = connect_async(endpoint)
        .await
        .map_err(|e| SdkError::Handshake(e.to_string()))?;

    let (event_tx, event_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);

    tokio::spawn(run_socket(ws, event_tx, cmd_rx));

    Ok((SocketHandle { cmd_tx }, event_rx))
}

async fn run_socket(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    event_tx: mpsc::Sender<SocketEvent>,
    mut cmd_rx: mpsc::Receiver<Command>,
) {
    let (mut sink, mut stream) = ws.split();
    let _ = event_tx.send(SocketEvent::Opened).await;

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<Envelope>(text.as_str()) {
                        Ok(env) => {
                            let _ = event_tx.send(SocketEvent::Message(env)).await;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping malformed frame");
                        }
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = sink.send(Message::Pong(payload)).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((1005, String::new()));
                    let _ = event_tx.send(SocketEvent::Closed { code, reason }).await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = event_tx
                        .send(SocketEvent::Failed { reason: e.to_string() })
                        .await;
                    break;
                }
                None => {
                    let _ = event_tx
                        .send(SocketEvent::Closed { code: 1006, reason: "EOF".to_string() })
                        .await;
                    break;
                }
            },
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Send(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        let _ = event_tx
                            .send(SocketEvent::Failed { reason: e.to_string() })
                            .await;
                        break;
                    }
                }
                Some(Command::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    let _ = event_tx
                        .send(SocketEvent::Closed { code: 1000, reason: "client close".to_string() })
                        .await;
                    break;
                }
            },
        }
    }
}
