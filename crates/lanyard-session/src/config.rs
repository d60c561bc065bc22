//! Session configuration.

use std::time::Duration;

use lanyard_room::RoomConfig;

/// Configuration for session behavior.
///
/// The two endpoints are the only required inputs; everything else has a
/// sensible default. Start from [`SessionConfig::new`] and override the
/// fields you care about:
///
/// ```rust
/// use std::time::Duration;
/// use lanyard_session::SessionConfig;
///
/// let config = SessionConfig {
///     reconnect_max_attempts: 5,
///     ..SessionConfig::new("ws://identity.example", "ws://world.example")
/// };
/// assert_eq!(config.reconnect_base_delay, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint of the identity room.
    pub identity_endpoint: String,

    /// WebSocket endpoint of the world room.
    pub world_endpoint: String,

    /// Delay before the first identity reconnect attempt. Each further
    /// attempt doubles it: base, base*2, base*4, ... plus a little
    /// random jitter so a fleet of clients doesn't reconnect in step.
    ///
    /// Default: 2 seconds.
    pub reconnect_base_delay: Duration,

    /// Upper bound on the (pre-jitter) reconnect delay.
    ///
    /// Default: 30 seconds.
    pub reconnect_max_delay: Duration,

    /// How many reconnect attempts to make after a connect failure or a
    /// dropped identity channel before giving up and going degraded.
    /// Set to 0 to disable reconnection entirely.
    ///
    /// Default: 3.
    pub reconnect_max_attempts: u32,

    /// Buffer size of the session event channel. Slow subscribers that
    /// fall more than this far behind start losing the oldest events.
    ///
    /// Default: 64.
    pub event_capacity: usize,

    /// Per-connection settings (join timeout, request timeout, ping).
    pub room: RoomConfig,
}

impl SessionConfig {
    /// Creates a config for the given endpoints with default timings.
    pub fn new(identity_endpoint: impl Into<String>, world_endpoint: impl Into<String>) -> Self {
        Self {
            identity_endpoint: identity_endpoint.into(),
            world_endpoint: world_endpoint.into(),
            reconnect_base_delay: Duration::from_secs(2),
            reconnect_max_delay: Duration::from_secs(30),
            reconnect_max_attempts: 3,
            event_capacity: 64,
            room: RoomConfig::default(),
        }
    }

    /// Clamps degenerate values to safe minimums, warning about each one.
    /// A zero base delay would turn reconnection into a hot loop, and a
    /// zero-capacity event channel can't be constructed.
    pub fn validated(mut self) -> Self {
        if self.reconnect_base_delay < Duration::from_millis(100) {
            tracing::warn!(
                configured = ?self.reconnect_base_delay,
                "reconnect_base_delay too small, clamping to 100ms"
            );
            self.reconnect_base_delay = Duration::from_millis(100);
        }
        if self.reconnect_max_delay < self.reconnect_base_delay {
            tracing::warn!(
                configured = ?self.reconnect_max_delay,
                "reconnect_max_delay below base delay, raising to match"
            );
            self.reconnect_max_delay = self.reconnect_base_delay;
        }
        if self.event_capacity == 0 {
            tracing::warn!("event_capacity of 0 is not usable, clamping to 1");
            self.event_capacity = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_documented_defaults() {
        let config = SessionConfig::new("ws://id", "ws://world");
        assert_eq!(config.reconnect_base_delay, Duration::from_secs(2));
        assert_eq!(config.reconnect_max_delay, Duration::from_secs(30));
        assert_eq!(config.reconnect_max_attempts, 3);
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_validated_clamps_zero_base_delay() {
        let config = SessionConfig {
            reconnect_base_delay: Duration::ZERO,
            ..SessionConfig::new("ws://id", "ws://world")
        }
        .validated();
        assert_eq!(config.reconnect_base_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_validated_raises_max_delay_to_base() {
        let config = SessionConfig {
            reconnect_base_delay: Duration::from_secs(10),
            reconnect_max_delay: Duration::from_secs(1),
            ..SessionConfig::new("ws://id", "ws://world")
        }
        .validated();
        assert_eq!(config.reconnect_max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_validated_keeps_sane_values_unchanged() {
        let config = SessionConfig::new("ws://id", "ws://world").validated();
        assert_eq!(config.reconnect_base_delay, Duration::from_secs(2));
        assert_eq!(config.event_capacity, 64);
    }
}
