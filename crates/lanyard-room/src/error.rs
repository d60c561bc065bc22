//! Error types for the connection layer.

use lanyard_protocol::{ErrorCode, ProtocolError};

/// Errors that can occur in the raw transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Dialing the endpoint failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}

/// Errors that can occur while opening or using a room connection.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The room refused the join after the socket handshake succeeded.
    #[error("room rejected join ({code}): {message}")]
    Rejected { code: ErrorCode, message: String },

    /// No ready signal arrived within the join timeout.
    #[error("timed out waiting for the room to accept the join")]
    JoinTimeout,

    /// A correlated request got no reply within the request timeout.
    /// The pending entry has already been deregistered.
    #[error("request timed out")]
    RequestTimeout,

    /// The connection closed (or was closed) before the operation
    /// finished.
    #[error("connection closed")]
    ConnectionClosed,
}

impl RoomError {
    /// Returns `true` for failures worth retrying with backoff —
    /// transport trouble and timeouts. Rejections and protocol errors
    /// mean retrying the same thing will fail the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::JoinTimeout
                | Self::RequestTimeout
                | Self::ConnectionClosed
        )
    }
}
