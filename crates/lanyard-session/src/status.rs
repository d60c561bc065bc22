//! Session status: where the client is in the connect → login → world flow.

use std::fmt;

/// The client's position in the session lifecycle.
///
/// This is a state machine the [`SessionCoordinator`](crate::SessionCoordinator)
/// walks forward one operation at a time:
///
/// ```text
/// Anonymous ──→ ConnectingIdentity ──→ AwaitingCredentials ──→ Authenticated ──→ JoiningWorld ──→ InWorld
///     ↑                │                                           ↑   │                             │
///     │                │ (identity retries exhausted)              │   └──── (join failed) ──────────┤
///     │                ▼                                           │                                 │
///     │            Degraded ─────(connect_identity again)──→ ...   └───────── (world lost) ──────────┘
///     │
///     └── logout(), from any state
/// ```
///
/// Two transitions run backwards on purpose:
///
/// - A failed or abandoned world join falls back to `Authenticated` — the
///   session itself is still good, only the world attempt died.
/// - `logout()` jumps to `Anonymous` from anywhere, including mid-flight
///   operations.
///
/// `Degraded` means the identity channel could not be (re)established
/// after the configured retries. The session gives up until the caller
/// asks for a fresh [`connect_identity`](crate::SessionCoordinator::connect_identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionStatus {
    /// No server contact, no credentials in play.
    Anonymous = 0,

    /// Dialing the identity room (including backoff retries).
    ConnectingIdentity = 1,

    /// Identity channel is up; the room is waiting for a login.
    AwaitingCredentials = 2,

    /// Logged in: tokens held, profile cached, identity channel live.
    Authenticated = 3,

    /// Two-phase world handoff in progress (ticket, then world join).
    JoiningWorld = 4,

    /// Both channels live; world traffic is flowing.
    InWorld = 5,

    /// Identity room unreachable and retries are exhausted.
    Degraded = 6,
}

impl SessionStatus {
    /// Reconstructs a status from its `repr(u8)` value. Used by the
    /// coordinator, which keeps the current status in an atomic.
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Anonymous,
            1 => Self::ConnectingIdentity,
            2 => Self::AwaitingCredentials,
            3 => Self::Authenticated,
            4 => Self::JoiningWorld,
            5 => Self::InWorld,
            _ => Self::Degraded,
        }
    }

    /// `true` once login has succeeded and until logout or expiry —
    /// covers the world-join sub-states too.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated | Self::JoiningWorld | Self::InWorld)
    }

    /// `true` while the world channel is (supposed to be) live.
    pub fn is_in_world(&self) -> bool {
        matches!(self, Self::InWorld)
    }

    /// `true` in the one state where a `login()` call makes sense: the
    /// identity channel is up and no session is active yet. Switching
    /// accounts goes through logout first.
    pub fn can_login(&self) -> bool {
        matches!(self, Self::AwaitingCredentials)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Anonymous => "anonymous",
            Self::ConnectingIdentity => "connecting_identity",
            Self::AwaitingCredentials => "awaiting_credentials",
            Self::Authenticated => "authenticated",
            Self::JoiningWorld => "joining_world",
            Self::InWorld => "in_world",
            Self::Degraded => "degraded",
        };
        write!(f, "{name}")
    }
}
