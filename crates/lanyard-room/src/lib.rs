//! Client transport layer and room connections for Lanyard.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! the network protocol used to reach a room, plus [`RoomConnection`] — the
//! lifecycle wrapper that joins a room, correlates request/response frames,
//! and surfaces pushed frames as a [`RoomEvent`] stream.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket connector via `tokio-tungstenite`

mod config;
mod connection;
mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use config::{LinkState, RoomConfig};
pub use connection::{JoinedRoom, RoomConnection, RoomEvent};
pub use error::{RoomError, TransportError};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one transport connection for the lifetime of the process.
///
/// Ids exist for log correlation: a connection logs its id when it opens
/// and again when it closes, so the two ends of a lifecycle can be
/// matched up in interleaved output. They never go over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates the next process-wide id.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps an explicit raw value, for callers that number their
    /// connections themselves.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Dials new outbound connections.
///
/// `connect` is declared as `impl Future + Send` rather than `async fn`
/// so callers can drive it from spawned tasks (reconnect loops, world
/// joins). Implementations can still be written as plain `async fn`.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Dials the given endpoint and completes the protocol handshake.
    fn connect(
        &self,
        endpoint: &str,
    ) -> impl std::future::Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single connection that can send and receive bytes.
///
/// Methods take `&mut self`: one task owns the connection and drives both
/// directions, which keeps implementations lock-free. That owning task is
/// spawned, so every returned future carries a `Send` bound.
pub trait Connection: Send + 'static {
    /// Sends data to the remote peer.
    fn send(
        &mut self,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&mut self)
        -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_round_trips_raw_value() {
        assert_eq!(ConnectionId::new(41).into_inner(), 41);
        assert_eq!(ConnectionId::new(41), ConnectionId::new(41));
    }

    #[test]
    fn test_connection_id_display_is_hash_prefixed() {
        assert_eq!(ConnectionId::new(12).to_string(), "#12");
    }

    #[test]
    fn test_connection_id_next_never_repeats() {
        // The counter is process-global, so parallel tests may interleave
        // allocations; two calls from one thread still order strictly.
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
        assert!(b.into_inner() > a.into_inner());
    }
}
