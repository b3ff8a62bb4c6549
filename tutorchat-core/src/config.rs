//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tutorchat_sdk::reconnect::{BACKOFF_DELAYS, ReconnectConfig};

/// Everything the composition root needs to wire the client together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Base URL for the confirming REST endpoints, e.g. `https://api.example.com`.
    pub api_base_url: String,
    /// Push endpoint prefix; the signed-in user id is appended to form the
    /// final endpoint, e.g. `wss://api.example.com/ws/`.
    pub ws_base_url: String,
    /// Database file. `None` keeps everything in memory (tests).
    pub db_path: Option<PathBuf>,
    /// Per-request timeout for the REST client, in seconds.
    pub request_timeout_secs: u64,
    /// Reconnect attempts before giving up. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
    /// Outbound queue entries past this many retries are dropped (and the
    /// drop is surfaced to observers).
    pub outbound_retry_limit: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            ws_base_url: "ws://127.0.0.1:8000/ws/".to_string(),
            db_path: None,
            request_timeout_secs: 15,
            max_reconnect_attempts: Some(10),
            outbound_retry_limit: 3,
        }
    }
}

impl CoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect(&self) -> ReconnectConfig {
        ReconnectConfig {
            backoff: BACKOFF_DELAYS.to_vec(),
            max_attempts: self.max_reconnect_attempts,
        }
    }
}
