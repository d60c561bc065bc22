//! The token seam between the session and the REST layer.
//!
//! The REST gateway needs two things from whoever owns authentication:
//! the current access token, and a way to get a fresh one when the server
//! says the current one expired. It does not need logins, state machines,
//! or channels — so [`TokenSource`] exposes exactly those two things and
//! nothing else.
//!
//! # Why a trait?
//!
//! The obvious provider is [`SessionCoordinator`](crate::SessionCoordinator),
//! and it implements this trait. But tests want a scripted source, and a
//! one-shot CLI tool may want a fixed token with no session behind it at
//! all. The gateway is generic over `TokenSource` and can't tell the
//! difference.

use crate::SessionError;

/// Supplies bearer tokens to the REST layer.
///
/// # Trait bounds
///
/// - `Send + Sync` — the gateway is shared across async tasks.
/// - `'static` — the source lives as long as the client.
///
/// # Example
///
/// ```rust
/// use lanyard_session::{SessionError, TokenSource};
///
/// /// Serves one fixed token and never refreshes. Enough for a tool
/// /// that talks to the REST API with a long-lived service token.
/// struct StaticToken(String);
///
/// impl TokenSource for StaticToken {
///     fn access_token(&self) -> Option<String> {
///         Some(self.0.clone())
///     }
///
///     async fn refresh(&self) -> Result<String, SessionError> {
///         Err(SessionError::NoStoredSession)
///     }
/// }
/// ```
pub trait TokenSource: Send + Sync + 'static {
    /// Returns the current access token, or `None` when no session is
    /// held.
    fn access_token(&self) -> Option<String>;

    /// Performs one refresh exchange and returns the new access token.
    ///
    /// Implementations are expected to collapse concurrent callers into
    /// a single exchange — the gateway calls this whenever a request
    /// comes back `TOKEN_EXPIRED`, and several requests can hit that at
    /// the same moment.
    ///
    /// # Errors
    /// An error means the session could not be refreshed and the caller
    /// should treat it as expired. No retry will help.
    fn refresh(
        &self,
    ) -> impl std::future::Future<Output = Result<String, SessionError>> + Send;
}
