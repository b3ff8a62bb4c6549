//! Durable at-least-once outbound queue.
//!
//! Push-style sends go straight to the live socket when one exists. When the
//! socket is down, or the write fails, the frame is persisted instead and
//! replayed the next time the connection opens. Entries stay queued until
//! the server acknowledges their idempotency token — a successful `send`
//! alone retires nothing, because the frame may have died with the
//! connection before the server saw it. The token lets the server (and our
//! own ACK matching) deduplicate a frame that got through twice.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use serde_json::Value;

use tutorchat_sdk::SdkError;
use tutorchat_sdk::reconnect::ReconnectHandle;
use tutorchat_sdk::wire::Envelope;

use crate::error::CoreError;
use crate::model::{PendingOutbound, now_millis};
use crate::store::Store;

/// Where outbound frames go. The orchestrator passes the live connection;
/// tests pass a recorder.
pub trait OutboundSink: Send + Sync {
    fn connected(&self) -> bool;
    fn send(&self, text: String) -> impl Future<Output = Result<(), SdkError>> + Send;
}

impl OutboundSink for ReconnectHandle {
    fn connected(&self) -> bool {
        self.is_connected()
    }

    async fn send(&self, text: String) -> Result<(), SdkError> {
        ReconnectHandle::send(self, text).await
    }
}

/// How a frame left the building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the live socket (still unconfirmed until its ACK).
    Sent { token: String },
    /// Persisted for replay on the next connect.
    Queued { token: String },
}

impl Delivery {
    pub fn token(&self) -> &str {
        match self {
            Delivery::Sent { token } | Delivery::Queued { token } => token,
        }
    }
}

/// Result of one drain pass.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Tokens transmitted this pass (entries stay queued until their ACK).
    pub sent: Vec<String>,
    /// Entries deleted without transmission: their retry ceiling was hit.
    pub dropped: Vec<PendingOutbound>,
}

pub struct Outbox {
    store: Arc<Store>,
    retry_limit: u32,
    /// Seeded from the clock so tokens stay unique across restarts.
    token_seq: AtomicI64,
}

impl Outbox {
    pub fn new(store: Arc<Store>, retry_limit: u32) -> Self {
        Self {
            store,
            retry_limit,
            token_seq: AtomicI64::new(now_millis()),
        }
    }

    /// Next idempotency token; monotonically increasing.
    fn next_token(&self) -> String {
        self.token_seq.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// Send `data` as a `kind` envelope, live if possible, queued otherwise.
    pub async fn send_or_enqueue<S: OutboundSink>(
        &self,
        sink: &S,
        kind: &str,
        data: Value,
    ) -> Result<Delivery, CoreError> {
        let token = self.next_token();
        let envelope = Envelope::outbound(kind, data, token.clone());
        let payload = serde_json::to_string(&envelope)?;

        if sink.connected() {
            match sink.send(payload.clone()).await {
                Ok(()) => {
                    tracing::debug!(token = %token, kind, "sent live");
                    return Ok(Delivery::Sent { token });
                }
                Err(e) => {
                    tracing::warn!(error = %e, token = %token, "live send failed, queueing");
                }
            }
        }

        self.store.enqueue_outbound(kind, &payload, &token, now_millis())?;
        tracing::debug!(token = %token, kind, "queued for later delivery");
        Ok(Delivery::Queued { token })
    }

    /// Persist without attempting a live send.
    pub fn enqueue(&self, kind: &str, data: Value) -> Result<String, CoreError> {
        let token = self.next_token();
        let envelope = Envelope::outbound(kind, data, token.clone());
        let payload = serde_json::to_string(&envelope)?;
        self.store.enqueue_outbound(kind, &payload, &token, now_millis())?;
        Ok(token)
    }

    /// Replay queued entries in enqueue order.
    ///
    /// Entries at the retry ceiling are deleted without transmission and
    /// reported so the caller can surface the loss. A send failure bumps the
    /// entry's retry count and ends the pass — the connection is gone, and
    /// the next successful connect drains again.
    pub async fn drain<S: OutboundSink>(&self, sink: &S) -> Result<DrainReport, CoreError> {
        let entries = self.store.outbound_in_order()?;
        let mut report = DrainReport::default();
        if entries.is_empty() {
            return Ok(report);
        }
        tracing::debug!(count = entries.len(), "draining outbound queue");

        for entry in entries {
            if entry.retry_count >= self.retry_limit {
                tracing::warn!(
                    token = %entry.token,
                    retries = entry.retry_count,
                    "outbound entry exceeded retry ceiling, dropping"
                );
                self.store.remove_outbound(entry.id)?;
                report.dropped.push(entry);
                continue;
            }
            match sink.send(entry.payload.clone()).await {
                Ok(()) => {
                    report.sent.push(entry.token);
                }
                Err(e) => {
                    tracing::warn!(error = %e, token = %entry.token, "send failed during drain");
                    self.store.bump_outbound_retry(entry.id)?;
                    break;
                }
            }
        }
        Ok(report)
    }

    /// Retire the entry matching an acknowledged token. Returns `false` for
    /// an unknown token — not an error, the entry may have been retired by
    /// an earlier duplicate ACK.
    pub fn acknowledge(&self, token: &str) -> Result<bool, CoreError> {
        let removed = self.store.remove_outbound_by_token(token)?;
        if removed > 0 {
            tracing::debug!(token = %token, "outbound entry acknowledged");
        } else {
            tracing::debug!(token = %token, "ack for unknown token, ignoring");
        }
        Ok(removed > 0)
    }

    /// Entries currently awaiting acknowledgment.
    pub fn pending(&self) -> Result<Vec<PendingOutbound>, CoreError> {
        Ok(self.store.outbound_in_order()?)
    }
}
