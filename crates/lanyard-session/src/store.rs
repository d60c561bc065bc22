//! Token storage: where the session's credentials and cached profile live.
//!
//! The [`TokenStore`] trait is the seam between the session logic and
//! whatever persistence the host application wants — in-memory for tests
//! and short-lived tools, a file for desktop clients, the platform
//! keychain behind a custom impl.
//!
//! The store's one hard rule: the access and refresh tokens travel as a
//! [`TokenPair`], always replaced together. A store never ends up holding
//! a new access token next to a stale refresh token.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use lanyard_protocol::UserProfile;
use serde::{Deserialize, Serialize};

/// An access/refresh token pair, replaced as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived bearer token attached to REST requests.
    pub access: String,

    /// Long-lived token used only to mint fresh pairs.
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

/// Storage for the session's tokens and cached user profile.
///
/// Methods are synchronous and infallible from the caller's point of
/// view: implementations that persist externally treat their in-memory
/// copy as authoritative and log persistence trouble instead of
/// surfacing it — a failed disk write shouldn't kill a live session.
pub trait TokenStore: Send + Sync + 'static {
    /// Returns the current token pair, if a session is stored.
    fn tokens(&self) -> Option<TokenPair>;

    /// Replaces both tokens as one unit.
    fn set_tokens(&self, pair: TokenPair);

    /// Returns the cached user profile, if any.
    fn user(&self) -> Option<UserProfile>;

    /// Caches the user profile alongside the tokens.
    fn set_user(&self, user: UserProfile);

    /// Wipes tokens and profile. Logging out and token revocation both
    /// land here.
    fn clear(&self);
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    tokens: Option<TokenPair>,
    #[serde(default)]
    user: Option<UserProfile>,
}

// ---------------------------------------------------------------------------
// MemoryTokenStore
// ---------------------------------------------------------------------------

/// A [`TokenStore`] that keeps everything in memory. The default for
/// tests and tools that shouldn't leave credentials behind.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    state: Mutex<StoreState>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn tokens(&self) -> Option<TokenPair> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
            .clone()
    }

    fn set_tokens(&self, pair: TokenPair) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens = Some(pair);
    }

    fn user(&self) -> Option<UserProfile> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    fn set_user(&self, user: UserProfile) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .user = Some(user);
    }

    fn clear(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = StoreState::default();
    }
}

// ---------------------------------------------------------------------------
// FileTokenStore
// ---------------------------------------------------------------------------

/// A [`TokenStore`] persisted to a JSON file, so a restarted client can
/// resume its session without asking for credentials again.
///
/// Writes go to a sibling temp file first and are renamed into place, so
/// a crash mid-write leaves the previous state intact rather than a
/// half-written file. The in-memory copy is authoritative: IO failures
/// are logged at warn and the session carries on.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl FileTokenStore {
    /// Opens the store at `path`, loading any previously persisted state.
    /// A missing file is a fresh store; an unreadable one is logged and
    /// treated as fresh.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "token store file corrupt, starting fresh");
                    StoreState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "token store file unreadable, starting fresh");
                StoreState::default()
            }
        };
        Self {
            path,
            state: Mutex::new(state),
        }
    }

    fn persist(&self, state: &StoreState) {
        let bytes = match serde_json::to_vec_pretty(state) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize token store");
                return;
            }
        };
        let tmp = self.path.with_extension("tmp");
        let result = std::fs::write(&tmp, &bytes).and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist token store");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn tokens(&self) -> Option<TokenPair> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
            .clone()
    }

    fn set_tokens(&self, pair: TokenPair) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.tokens = Some(pair);
        self.persist(&state);
    }

    fn user(&self) -> Option<UserProfile> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    fn set_user(&self, user: UserProfile) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.user = Some(user);
        self.persist(&state);
    }

    fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = StoreState::default();
        self.persist(&state);
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lanyard_protocol::UserId;

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            id: UserId::from("user-1"),
            display_name: name.into(),
            level: 1,
            currencies: Default::default(),
        }
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lanyard-store-{}-{tag}.json", std::process::id()))
    }

    // =====================================================================
    // MemoryTokenStore
    // =====================================================================

    #[test]
    fn test_memory_store_set_tokens_replaces_pair_as_a_unit() {
        let store = MemoryTokenStore::new();
        store.set_tokens(TokenPair::new("a1", "r1"));
        store.set_tokens(TokenPair::new("a2", "r2"));

        let pair = store.tokens().unwrap();
        assert_eq!(pair.access, "a2");
        assert_eq!(pair.refresh, "r2");
    }

    #[test]
    fn test_memory_store_clear_wipes_tokens_and_profile() {
        let store = MemoryTokenStore::new();
        store.set_tokens(TokenPair::new("a", "r"));
        store.set_user(profile("Alice"));

        store.clear();

        assert!(store.tokens().is_none());
        assert!(store.user().is_none());
    }

    #[test]
    fn test_memory_store_starts_empty() {
        let store = MemoryTokenStore::new();
        assert!(store.tokens().is_none());
        assert!(store.user().is_none());
    }

    // =====================================================================
    // FileTokenStore
    // =====================================================================

    #[test]
    fn test_file_store_survives_reopen() {
        let path = temp_path("reopen");
        let _ = std::fs::remove_file(&path);

        let store = FileTokenStore::open(&path);
        store.set_tokens(TokenPair::new("persisted-access", "persisted-refresh"));
        store.set_user(profile("Alice"));
        drop(store);

        let reopened = FileTokenStore::open(&path);
        assert_eq!(reopened.tokens().unwrap().access, "persisted-access");
        assert_eq!(reopened.user().unwrap().display_name, "Alice");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_clear_persists_the_wipe() {
        let path = temp_path("clear");
        let _ = std::fs::remove_file(&path);

        let store = FileTokenStore::open(&path);
        store.set_tokens(TokenPair::new("a", "r"));
        store.clear();
        drop(store);

        let reopened = FileTokenStore::open(&path);
        assert!(reopened.tokens().is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_corrupt_file_starts_fresh() {
        let path = temp_path("corrupt");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = FileTokenStore::open(&path);
        assert!(store.tokens().is_none());

        // And it remains usable.
        store.set_tokens(TokenPair::new("a", "r"));
        assert!(store.tokens().is_some());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_missing_file_is_a_fresh_store() {
        let path = temp_path("missing");
        let _ = std::fs::remove_file(&path);

        let store = FileTokenStore::open(&path);
        assert!(store.tokens().is_none());
        assert!(store.user().is_none());
    }
}
