//! Transport Layer
//!
//! The client consumes a publish/subscribe session through the [`Session`]
//! trait and never interprets transport internals beyond "connected",
//! "not connected" and "session lost".
//!
//! ## Flow
//!
//! ```text
//!  Session::open ──► transport ──► SessionEvent (Established / Lost / Message)
//!                                        │
//!                                        ▼
//!                                  BeaconClient
//! ```

pub mod mqtt;

use snafu::Snafu;
use std::sync::Arc;

use crate::connection::ClientConfig;

/// Errors reported by a session implementation
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum TransportError {
    /// No session is established
    #[snafu(display("session not established"))]
    NotConnected,

    /// The transport refused the request (queue full, invalid topic, ...)
    #[snafu(display("request rejected: {message}"))]
    Rejected { message: String },

    /// The session ended and has not been reopened
    #[snafu(display("session closed"))]
    Closed,
}

/// Notification from a session to its owner
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Session established by the broker
    Established,
    /// Session ended; reconnection is up to the owner
    Lost { reason: Arc<str> },
    /// Inbound publish
    Message { topic: Arc<str>, payload: Arc<[u8]> },
}

/// An outbound-capable publish/subscribe session
pub trait Session {
    /// Whether the underlying network link is up
    fn link_up(&self) -> bool;

    /// Start opening a session. Must be a no-op while an open is in flight
    /// or a session is established.
    fn open(&mut self, config: &ClientConfig) -> Result<(), TransportError>;

    /// Subscribe to `topic` on the current session
    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Hand `payload` to the transport for delivery on `topic`.
    ///
    /// Success means the transport accepted the message, not that it was
    /// delivered.
    fn publish(&mut self, topic: &str, payload: Vec<u8>, retain: bool)
    -> Result<(), TransportError>;

    /// Close the session, if any
    fn close(&mut self);
}
