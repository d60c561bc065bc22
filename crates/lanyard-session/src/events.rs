//! Session events: how the rest of the application observes the session.
//!
//! The coordinator never calls back into UI code. It publishes
//! [`SessionEvent`]s on a broadcast bus and whoever cares — a login
//! screen, a connection indicator, a logger — subscribes and reacts.
//! Publishing with no subscribers is fine; the event just evaporates.

use lanyard_protocol::{ErrorCode, RoomTarget, UserProfile};
use tokio::sync::broadcast;

/// Events published by the session coordinator.
///
/// Every variant is a fact about something that already happened, not a
/// request — subscribers can't veto a transition by ignoring one.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Login (or resume) succeeded; tokens are stored and the profile is
    /// cached.
    Authenticated { user: UserProfile },

    /// The server rejected a login or resume attempt. The session stays
    /// in `awaiting_credentials` — show the error and let the user try
    /// again.
    LoginFailed { code: ErrorCode, message: String },

    /// The identity room asked for a login — the channel is up but not
    /// yet bound to a user.
    AuthRequired { message: String },

    /// A token refresh was refused. The stored session has been cleared;
    /// the user has to log in again.
    AuthExpired,

    /// A live channel dropped. For the identity room reconnection starts
    /// automatically; the world room stays down until the caller joins
    /// again.
    ConnectionLost {
        target: RoomTarget,
        reason: Option<String>,
    },

    /// Identity reconnection succeeded on the given attempt (1-based).
    ConnectionRestored { target: RoomTarget, attempt: u32 },

    /// Reconnection attempts are exhausted; the session is degraded.
    /// Published once per outage, not once per failed attempt.
    ConnectionFailed { target: RoomTarget },

    /// The world room accepted the ticket; gameplay traffic can flow.
    /// `lobby` is the state snapshot the room sent with its welcome.
    WorldJoined { lobby: Option<serde_json::Value> },

    /// An uncorrelated frame pushed by the world room.
    WorldMessage {
        kind: String,
        payload: serde_json::Value,
    },

    /// Local logout finished: channels closed, store wiped.
    LoggedOut,
}

impl SessionEvent {
    /// Stable name of the event kind, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::LoginFailed { .. } => "login_failed",
            Self::AuthRequired { .. } => "auth_required",
            Self::AuthExpired => "auth_expired",
            Self::ConnectionLost { .. } => "connection_lost",
            Self::ConnectionRestored { .. } => "connection_restored",
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::WorldJoined { .. } => "world_joined",
            Self::WorldMessage { .. } => "world_message",
            Self::LoggedOut => "logged_out",
        }
    }
}

/// A broadcast bus for [`SessionEvent`]s.
///
/// Cloning is cheap and every clone publishes into the same bus. Each
/// [`subscribe`](Self::subscribe) call gets an independent receiver that
/// sees every event published after the subscription.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a bus that buffers up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event to all current subscribers. An event with no
    /// subscribers is dropped silently.
    pub fn publish(&self, event: SessionEvent) {
        tracing::debug!(event = event.name(), "session event");
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(8);
        bus.publish(SessionEvent::LoggedOut);
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(SessionEvent::AuthExpired);

        assert_eq!(rx.recv().await.unwrap(), SessionEvent::AuthExpired);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_event() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(SessionEvent::LoggedOut);

        assert_eq!(a.recv().await.unwrap(), SessionEvent::LoggedOut);
        assert_eq!(b.recv().await.unwrap(), SessionEvent::LoggedOut);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new(8);
        bus.publish(SessionEvent::AuthExpired);

        let mut rx = bus.subscribe();
        bus.publish(SessionEvent::LoggedOut);

        // Only the event published after subscribing arrives.
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::LoggedOut);
    }
}
