//! Events emitted by the connection layer for the consumer to process.

use crate::wire::Envelope;

/// Lifecycle and traffic events, delivered in order on one channel.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// Socket is open and ready to send.
    Opened,

    /// One parsed envelope from the server. Frames that are not valid JSON
    /// envelopes are dropped (and logged) before this point.
    Message(Envelope),

    /// The socket closed (orderly close frame or EOF).
    Closed { code: u16, reason: String },

    /// The connect attempt or the established socket failed.
    Failed { reason: String },

    /// Reconnection hit its attempt ceiling. Terminal: no further events
    /// follow until the consumer opens a new connection.
    GaveUp { attempts: u32 },
}
