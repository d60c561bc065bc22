//! Room connection configuration and lifecycle state.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for one room connection.
///
/// The defaults suit the interactive flows this crate exists for: a join
/// that hasn't been accepted within ten seconds is treated as failed
/// rather than leaving a login screen spinning forever.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// How long `open` waits for the dial plus the room's ready signal.
    pub join_timeout: Duration,

    /// How long a correlated request waits for its reply.
    pub request_timeout: Duration,

    /// How often the connection pings the room to keep the channel warm
    /// and measure round-trip time.
    pub ping_interval: Duration,

    /// Capacity of the event stream handed back from `open`. When a slow
    /// consumer lets it fill up, pushed room frames are dropped (with a
    /// warning); the final close notification is never dropped.
    pub event_buffer: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(5),
            event_buffer: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// LinkState
// ---------------------------------------------------------------------------

/// The lifecycle state of one room connection.
///
/// ```text
/// Opening → Open → Closing → Closed
///             │                 ▲
///             └────────→ Errored
/// ```
///
/// - **Opening**: socket dialed, waiting for the room's ready signal.
/// - **Open**: welcome received; requests and sends flow.
/// - **Closing**: a local `close()` was requested; teardown in progress.
/// - **Closed**: the channel ended cleanly (either side).
/// - **Errored**: the channel died from a transport failure.
///
/// A connection is never reused past `Closed`/`Errored` — callers build a
/// fresh one for every reconnect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkState {
    Opening = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
    Errored = 4,
}

impl LinkState {
    /// Returns `true` while the channel accepts traffic.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` once the channel is gone for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Opening,
            1 => Self::Open,
            2 => Self::Closing,
            4 => Self::Errored,
            _ => Self::Closed,
        }
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
            Self::Errored => write!(f, "errored"),
        }
    }
}
