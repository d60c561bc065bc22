//! Unified error type for the lanyard SDK.

use lanyard_gateway::GatewayError;
use lanyard_protocol::ProtocolError;
use lanyard_room::RoomError;
use lanyard_session::SessionError;

/// Everything a [`LanyardClient`](crate::LanyardClient) call can fail
/// with.
///
/// Each layer keeps its own error enum; this one folds them together so
/// application code can `?` any client call without naming the layer
/// that failed. Matching on the variant recovers the layer when the
/// caller cares which one it was.
#[derive(Debug, thiserror::Error)]
pub enum LanyardError {
    /// A protocol-level error (encode, decode, unexpected frame).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A realtime-channel error (connect, join, request timeout).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A session-level error (state machine, credentials, abort).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A REST gateway error (transport, API failure, auth expiry).
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_room_error() {
        let err = RoomError::JoinTimeout;
        let lanyard_err: LanyardError = err.into();
        assert!(matches!(lanyard_err, LanyardError::Room(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NoStoredSession;
        let lanyard_err: LanyardError = err.into();
        assert!(matches!(lanyard_err, LanyardError::Session(_)));
    }

    #[test]
    fn test_from_gateway_error() {
        let err = GatewayError::Api {
            status: 503,
            code: None,
            message: "maintenance".into(),
        };
        let lanyard_err: LanyardError = err.into();
        assert!(matches!(lanyard_err, LanyardError::Gateway(_)));
    }

    #[test]
    fn test_transparent_display_keeps_the_inner_message() {
        let err: LanyardError = SessionError::ChannelDown.into();
        assert_eq!(err.to_string(), SessionError::ChannelDown.to_string());
    }
}
