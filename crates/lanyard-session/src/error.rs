//! Error types for the session layer.

use lanyard_protocol::ErrorCode;
use lanyard_room::RoomError;

use crate::SessionStatus;

/// Errors that can occur while driving a session.
///
/// These cover the full client-side lifecycle: connecting the identity
/// channel, exchanging credentials, refreshing tokens, and the two-phase
/// world handoff.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation is not valid in the current status — for example
    /// `join_world()` before logging in, or `login()` before
    /// `connect_identity()`.
    #[error("operation not allowed while {status}")]
    InvalidState { status: SessionStatus },

    /// The server rejected a credential exchange: wrong login, a revoked
    /// refresh token, an expired ticket. Retrying with the same inputs
    /// will fail the same way.
    #[error("credential exchange failed ({code}): {message}")]
    Credential { code: ErrorCode, message: String },

    /// `resume()` was called but the token store holds no session to
    /// resume from.
    #[error("no stored session to resume")]
    NoStoredSession,

    /// The identity channel is down — usually mid-reconnect. The
    /// operation can be retried once the channel is restored.
    #[error("identity channel is not connected")]
    ChannelDown,

    /// A `logout()` cut this operation off before it could commit.
    #[error("operation aborted by logout")]
    Aborted,

    /// The underlying room connection failed.
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_error_converts_to_session_error() {
        let err: SessionError = RoomError::JoinTimeout.into();
        assert!(matches!(err, SessionError::Room(RoomError::JoinTimeout)));
    }

    #[test]
    fn test_invalid_state_names_the_status() {
        let err = SessionError::InvalidState {
            status: SessionStatus::Anonymous,
        };
        assert_eq!(err.to_string(), "operation not allowed while anonymous");
    }

    #[test]
    fn test_credential_error_carries_the_code() {
        let err = SessionError::Credential {
            code: ErrorCode::InvalidCredentials,
            message: "wrong secret".into(),
        };
        assert!(err.to_string().contains("INVALID_CREDENTIALS"));
    }
}
