//! Connection orchestration.
//!
//! One [`ConnectionManager`] per process owns the live push connection.
//! Nothing else may open, close, or write the socket directly: sends go
//! through [`ConnectionManager::send`] (which falls back to the durable
//! outbox), and inbound traffic is dispatched here, one event at a time in
//! arrival order, on a task separate from the socket reader.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use tutorchat_sdk::event::SocketEvent;
use tutorchat_sdk::reconnect::{self, ReconnectConfig, ReconnectHandle};

use crate::dispatch;
use crate::error::CoreError;
use crate::outbox::{Delivery, Outbox};
use crate::session::Credentials;
use crate::store::Store;

/// Notifications republished to observers (the UI layer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Connectivity changed. Transport failures surface only as this.
    ConnectionChanged { connected: bool },
    /// A pushed chat message landed in conversation `question_id`.
    NewMessage { question_id: i64 },
    /// An outbound entry hit its retry ceiling and was deleted unsent.
    OutboundDropped { token: String, kind: String },
    /// Reconnection stopped at its attempt ceiling.
    ReconnectGaveUp { attempts: u32 },
}

/// Read-only projection of the connection for observers.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub connected: bool,
    pub endpoint: Option<String>,
    /// Failures since the last successful open. Resets to 0 on open.
    pub attempt: u32,
}

pub struct ConnectionManager {
    store: Arc<Store>,
    outbox: Arc<Outbox>,
    session: Arc<dyn Credentials>,
    reconnect: ReconnectConfig,
    events: broadcast::Sender<ClientEvent>,
    state: watch::Sender<ConnectionState>,
    conn: Mutex<Option<ReconnectHandle>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(
        store: Arc<Store>,
        outbox: Arc<Outbox>,
        session: Arc<dyn Credentials>,
        reconnect: ReconnectConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        let (state, _) = watch::channel(ConnectionState::default());
        Self {
            store,
            outbox,
            session,
            reconnect,
            events,
            state,
            conn: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Subscribe to republished client events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Observe the connection state.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.conn
            .lock()
            .as_ref()
            .map(|h| h.is_connected())
            .unwrap_or(false)
    }

    /// Connect to `endpoint`, tearing down any previous connection first.
    pub async fn start(&self, endpoint: String) {
        self.stop().await;

        tracing::info!(endpoint = %endpoint, "opening push connection");
        let (handle, events_rx) = reconnect::open(endpoint.clone(), self.reconnect.clone());
        *self.conn.lock() = Some(handle.clone());
        self.state.send_modify(|s| {
            s.connected = false;
            s.endpoint = Some(endpoint);
            s.attempt = 0;
        });

        let task = tokio::spawn(run_loop(
            self.store.clone(),
            self.outbox.clone(),
            self.session.clone(),
            handle,
            events_rx,
            self.events.clone(),
            self.state.clone(),
        ));
        *self.task.lock() = Some(task);
    }

    /// Close the connection and wait for the dispatch task to finish.
    pub async fn stop(&self) {
        let handle = self.conn.lock().take();
        if let Some(h) = handle {
            h.close().await;
        }
        let task = self.task.lock().take();
        if let Some(t) = task {
            let _ = t.await;
        }
        self.state.send_modify(|s| s.connected = false);
    }

    /// Send a push-style frame: live when connected, queued otherwise.
    pub async fn send(&self, kind: &str, data: serde_json::Value) -> Result<Delivery, CoreError> {
        let handle = self.conn.lock().clone();
        match handle {
            Some(h) => self.outbox.send_or_enqueue(&h, kind, data).await,
            None => {
                let token = self.outbox.enqueue(kind, data)?;
                Ok(Delivery::Queued { token })
            }
        }
    }
}

async fn run_loop(
    store: Arc<Store>,
    outbox: Arc<Outbox>,
    session: Arc<dyn Credentials>,
    handle: ReconnectHandle,
    mut events_rx: mpsc::Receiver<SocketEvent>,
    events: broadcast::Sender<ClientEvent>,
    state: watch::Sender<ConnectionState>,
) {
    while let Some(event) = events_rx.recv().await {
        match event {
            SocketEvent::Opened => {
                state.send_modify(|s| {
                    s.connected = true;
                    s.attempt = 0;
                });
                let _ = events.send(ClientEvent::ConnectionChanged { connected: true });

                match outbox.drain(&handle).await {
                    Ok(report) => {
                        for entry in report.dropped {
                            let _ = events.send(ClientEvent::OutboundDropped {
                                token: entry.token,
                                kind: entry.kind,
                            });
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "outbox drain failed"),
                }
            }

            SocketEvent::Message(env) => {
                match dispatch::apply(&store, &outbox, session.role(), &env) {
                    Ok(notifications) => {
                        for n in notifications {
                            let _ = events.send(n);
                        }
                    }
                    // One bad frame must not stop the stream.
                    Err(e) => tracing::warn!(error = %e, kind = %env.kind, "push handler failed"),
                }
            }

            SocketEvent::Closed { code, reason } => {
                tracing::debug!(code, reason = %reason, "socket closed");
                state.send_modify(|s| {
                    s.connected = false;
                    s.attempt += 1;
                });
                let _ = events.send(ClientEvent::ConnectionChanged { connected: false });
            }

            SocketEvent::Failed { reason } => {
                tracing::warn!(reason = %reason, "socket failed");
                state.send_modify(|s| {
                    s.connected = false;
                    s.attempt += 1;
                });
                let _ = events.send(ClientEvent::ConnectionChanged { connected: false });
            }

            SocketEvent::GaveUp { attempts } => {
                tracing::warn!(attempts, "reconnection gave up");
                let _ = events.send(ClientEvent::ReconnectGaveUp { attempts });
            }
        }
    }
}
