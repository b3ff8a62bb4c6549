//! Errors surfaced by the connection layer.

use thiserror::Error;

/// Failures a consumer of this crate can observe.
#[derive(Debug, Clone, Error)]
pub enum SdkError {
    /// `send` was called while no live socket exists. Queueing is the
    /// caller's concern; the transport never buffers.
    #[error("not connected")]
    NotConnected,

    /// The WebSocket handshake (TCP connect, TLS, upgrade) failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The established socket failed mid-stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// Automatic reconnection hit its attempt ceiling and stopped.
    #[error("gave up after {attempts} reconnect attempts")]
    GaveUp { attempts: u32 },
}
