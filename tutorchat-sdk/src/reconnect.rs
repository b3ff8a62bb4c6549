//! Automatic reconnection over [`crate::socket`].
//!
//! On any close or failure that was not requested by the caller, a new
//! connection attempt is scheduled after `BACKOFF_DELAYS[attempt]`, capped at
//! the last table entry. The attempt counter resets to zero on every
//! successful open. An optional attempt ceiling turns permanent outages into
//! a terminal [`SocketEvent::GaveUp`] instead of retrying forever.
//!
//! Backoff sleeps run on the supervisor task, never on the task delivering
//! events to the consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};

use crate::error::SdkError;
use crate::event::SocketEvent;
use crate::socket::{self, SocketHandle};

/// Delay schedule between successive reconnect attempts.
pub const BACKOFF_DELAYS: [Duration; 6] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
    Duration::from_secs(16),
    Duration::from_secs(30),
];

/// Reconnection policy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay table; attempts beyond its length reuse the last entry.
    pub backoff: Vec<Duration>,
    /// Consecutive failed attempts before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            backoff: BACKOFF_DELAYS.to_vec(),
            max_attempts: Some(10),
        }
    }
}

/// Delay before reconnect attempt number `attempt` (zero-based).
pub fn backoff_delay(table: &[Duration], attempt: u32) -> Duration {
    if table.is_empty() {
        return Duration::from_secs(1);
    }
    let idx = (attempt as usize).min(table.len() - 1);
    table[idx]
}

/// Consecutive-failure counter driving the backoff schedule.
///
/// Kept separate from the supervisor loop so the reset/ceiling rules are
/// testable without a socket.
#[derive(Debug, Default)]
pub struct RetryState {
    attempt: u32,
}

impl RetryState {
    /// A connection opened; the next failure starts from the top of the table.
    pub fn on_opened(&mut self) {
        self.attempt = 0;
    }

    /// Register a failure. Returns the delay before the next attempt, or
    /// `None` once the ceiling is reached.
    pub fn on_failure(&mut self, config: &ReconnectConfig) -> Option<Duration> {
        self.attempt += 1;
        if let Some(max) = config.max_attempts
            && self.attempt > max
        {
            return None;
        }
        Some(backoff_delay(&config.backoff, self.attempt - 1))
    }

    /// Failures since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

struct Shared {
    connected: AtomicBool,
    closing: AtomicBool,
    current: parking_lot::Mutex<Option<SocketHandle>>,
    wake: Notify,
}

/// Handle to a self-healing connection. Clones address the same connection.
#[derive(Clone)]
pub struct ReconnectHandle {
    shared: Arc<Shared>,
}

impl ReconnectHandle {
    /// Whether a live, opened socket currently exists.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Send one text frame on the live socket.
    ///
    /// Fails with [`SdkError::NotConnected`] immediately when no socket is
    /// open; this call never waits for reconnection.
    pub async fn send(&self, text: String) -> Result<(), SdkError> {
        let handle = {
            let guard = self.shared.current.lock();
            match (&*guard, self.is_connected()) {
                (Some(h), true) => h.clone(),
                _ => return Err(SdkError::NotConnected),
            }
        };
        handle.send_text(text).await
    }

    /// Stop reconnecting and close any live socket.
    pub async fn close(&self) {
        self.shared.closing.store(true, Ordering::Release);
        self.shared.wake.notify_waiters();
        let handle = self.shared.current.lock().clone();
        if let Some(h) = handle {
            h.close().await;
        }
    }
}

/// Open `endpoint` with automatic reconnection.
///
/// Returns immediately; the first connect attempt happens on the spawned
/// supervisor task and its outcome arrives as an event.
pub fn open(
    endpoint: String,
    config: ReconnectConfig,
) -> (ReconnectHandle, mpsc::Receiver<SocketEvent>) {
    let (event_tx, event_rx) = mpsc::channel(256);
    let shared = Arc::new(Shared {
        connected: AtomicBool::new(false),
        closing: AtomicBool::new(false),
        current: parking_lot::Mutex::new(None),
        wake: Notify::new(),
    });

    let supervisor = shared.clone();
    tokio::spawn(async move {
        run_supervisor(endpoint, config, supervisor, event_tx).await;
    });

    (ReconnectHandle { shared }, event_rx)
}

async fn run_supervisor(
    endpoint: String,
    config: ReconnectConfig,
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<SocketEvent>,
) {
    let mut retry = RetryState::default();

    loop {
        if shared.closing.load(Ordering::Acquire) {
            break;
        }

        match socket::connect(&endpoint).await {
            Ok((handle, mut events)) => {
                *shared.current.lock() = Some(handle);
                while let Some(event) = events.recv().await {
                    let terminal = matches!(
                        event,
                        SocketEvent::Closed { .. } | SocketEvent::Failed { .. }
                    );
                    match &event {
                        SocketEvent::Opened => {
                            retry.on_opened();
                            shared.connected.store(true, Ordering::Release);
                        }
                        SocketEvent::Closed { .. } | SocketEvent::Failed { .. } => {
                            shared.connected.store(false, Ordering::Release);
                            *shared.current.lock() = None;
                        }
                        _ => {}
                    }
                    if event_tx.send(event).await.is_err() {
                        // Consumer hung up; stop retrying on its behalf.
                        return;
                    }
                    if terminal {
                        break;
                    }
                }
            }
            Err(e) => {
                if event_tx
                    .send(SocketEvent::Failed { reason: e.to_string() })
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }

        if shared.closing.load(Ordering::Acquire) {
            break;
        }

        let Some(delay) = retry.on_failure(&config) else {
            let attempts = retry.attempt().saturating_sub(1);
            tracing::warn!(attempts, "reconnect ceiling reached, giving up");
            let _ = event_tx.send(SocketEvent::GaveUp { attempts }).await;
            break;
        };

        tracing::warn!(
            attempt = retry.attempt(),
            delay_ms = delay.as_millis() as u64,
            "connection lost, retrying"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shared.wake.notified() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: Option<u32>) -> ReconnectConfig {
        ReconnectConfig { backoff: BACKOFF_DELAYS.to_vec(), max_attempts: max }
    }

    #[test]
    fn backoff_follows_table_then_caps() {
        let expected = [1, 2, 4, 8, 16, 30, 30, 30];
        for (attempt, secs) in expected.iter().enumerate() {
            assert_eq!(
                backoff_delay(&BACKOFF_DELAYS, attempt as u32),
                Duration::from_secs(*secs),
                "attempt {attempt}"
            );
        }
    }

    #[test]
    fn three_failures_then_open_resets_counter() {
        // Drop mid-session, fail three times, succeed on the fourth attempt.
        let cfg = config(None);
        let mut retry = RetryState::default();

        let delays: Vec<u64> = (0..3)
            .map(|_| retry.on_failure(&cfg).unwrap().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000]);
        assert_eq!(retry.attempt(), 3);

        retry.on_opened();
        assert_eq!(retry.attempt(), 0);
    }

    #[test]
    fn counter_never_decreases_without_open() {
        let cfg = config(None);
        let mut retry = RetryState::default();
        let mut last = 0;
        for _ in 0..12 {
            retry.on_failure(&cfg);
            assert!(retry.attempt() > last);
            last = retry.attempt();
        }
    }

    #[test]
    fn ceiling_stops_retries() {
        let cfg = config(Some(2));
        let mut retry = RetryState::default();
        assert!(retry.on_failure(&cfg).is_some());
        assert!(retry.on_failure(&cfg).is_some());
        assert_eq!(retry.on_failure(&cfg), None);
    }

    #[test]
    fn ceiling_resets_with_the_counter() {
        let cfg = config(Some(2));
        let mut retry = RetryState::default();
        assert!(retry.on_failure(&cfg).is_some());
        assert!(retry.on_failure(&cfg).is_some());
        retry.on_opened();
        // A fresh outage gets the full attempt allowance again.
        assert!(retry.on_failure(&cfg).is_some());
    }
}
