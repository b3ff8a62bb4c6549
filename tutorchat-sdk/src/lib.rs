//! Connection layer for tutorchat clients.
//!
//! This crate owns exactly one concern: a bidirectional WebSocket to the
//! push endpoint, wrapped in automatic reconnection with a fixed backoff
//! table. It decodes frames into [`wire::Envelope`] values and emits typed
//! [`event::SocketEvent`]s; it does not persist anything and it does not
//! queue sends. Callers that need an offline queue build it on top (see
//! `tutorchat-core`), because `send` on a dead connection is a visible
//! error here, never a silent buffer.

pub mod error;
pub mod event;
pub mod reconnect;
pub mod socket;
pub mod wire;

pub use error::SdkError;
pub use event::SocketEvent;
