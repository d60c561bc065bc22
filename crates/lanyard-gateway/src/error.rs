use lanyard_protocol::ErrorCode;
use lanyard_session::SessionError;
use thiserror::Error;

/// Errors surfaced by the REST gateway.
///
/// The distinction that matters most is [`Api`](GatewayError::Api) with
/// `status == 401` and `code == TOKEN_EXPIRED` versus every other 401:
/// only the former triggers the refresh-and-replay cycle, and it never
/// reaches callers (they see the replay's result instead). A revoked or
/// otherwise invalid token passes through untouched.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced an HTTP response: connect failure,
    /// timeout, broken body read.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error, either a non-2xx status or a
    /// `success: false` envelope inside a 2xx.
    #[error("api error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },

    /// Token refresh failed; the session is gone and the user has to log
    /// in again. Terminal for every request that hits it.
    #[error("session expired, log in again")]
    AuthExpired(#[source] SessionError),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl GatewayError {
    /// True only for the one condition that triggers refresh-and-replay:
    /// a 401 whose envelope code says the access token expired.
    pub fn is_token_expired(&self) -> bool {
        matches!(
            self,
            GatewayError::Api {
                status: 401,
                code: Some(ErrorCode::TokenExpired),
                ..
            }
        )
    }
}
