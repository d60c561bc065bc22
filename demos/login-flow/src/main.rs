//! A minimal lanyard client: logs in, enters the world and prints
//! session events until Ctrl-C.
//!
//! Point it at a running backend:
//!
//! ```text
//! LANYARD_IDENTITY_URL=ws://127.0.0.1:4000/identity \
//! LANYARD_WORLD_URL=ws://127.0.0.1:4001/world \
//! LANYARD_IDENTIFIER=alice LANYARD_SECRET=wonderland \
//! cargo run -p login-flow
//! ```
//!
//! The interesting part is the event loop: the session keeps the
//! identity channel alive on its own, but a dropped world connection is
//! only *reported*. Whether to rejoin is an application decision, and
//! this demo's answer is "immediately, once per drop".

use lanyard::prelude::*;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

struct DemoConfig {
    identity_url: String,
    world_url: String,
    api_url: String,
    identifier: String,
    secret: String,
}

impl DemoConfig {
    fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };
        Self {
            identity_url: var("LANYARD_IDENTITY_URL", "ws://127.0.0.1:4000/identity"),
            world_url: var("LANYARD_WORLD_URL", "ws://127.0.0.1:4001/world"),
            api_url: var("LANYARD_API_URL", "http://127.0.0.1:4002/api"),
            identifier: var("LANYARD_IDENTIFIER", "alice"),
            secret: var("LANYARD_SECRET", "wonderland"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session flow
// ---------------------------------------------------------------------------

/// Connects, authenticates and enters the world.
async fn login_and_join(
    client: &LanyardClient,
    identifier: &str,
    secret: &str,
) -> Result<UserProfile, LanyardError> {
    client.connect().await?;
    info!("identity channel up, logging in as {identifier}");

    let user = client.login(identifier, secret).await?;
    info!(level = user.level, "authenticated as {}", user.display_name);

    client.join_world().await?;
    info!("joined the world");
    Ok(user)
}

/// Prints session events until Ctrl-C or until the session gives up.
async fn watch_events(client: &LanyardClient, mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::ConnectionLost { target: RoomTarget::World, reason }) => {
                    warn!(?reason, "world connection lost, rejoining");
                    if let Err(err) = client.join_world().await {
                        warn!("rejoin failed: {err}");
                        break;
                    }
                }
                Ok(SessionEvent::AuthExpired) => {
                    warn!("session expired, log in again");
                    break;
                }
                Ok(SessionEvent::ConnectionFailed { target }) => {
                    warn!("gave up reconnecting the {target} channel");
                    break;
                }
                Ok(event) => report(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => warn!("dropped {n} events"),
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c, logging out");
                break;
            }
        }
    }
}

fn report(event: &SessionEvent) {
    match event {
        SessionEvent::WorldJoined { lobby: Some(lobby) } => info!("world says: {lobby}"),
        SessionEvent::WorldMessage { kind, payload } => info!("[{kind}] {payload}"),
        SessionEvent::ConnectionRestored { target, attempt } => {
            info!("{target} channel back after {attempt} attempt(s)");
        }
        other => info!("session event: {}", other.name()),
    }
}

#[tokio::main]
async fn main() -> Result<(), LanyardError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = DemoConfig::from_env();
    let client = LanyardClient::builder()
        .identity_endpoint(&config.identity_url)
        .world_endpoint(&config.world_url)
        .api_base_url(&config.api_url)
        .build()?;
    let events = client.subscribe();

    login_and_join(&client, &config.identifier, &config.secret).await?;

    // The gateway rides on the same session: the bearer token it attaches
    // is the one the login above just stored.
    match client.gateway().users().get::<UserProfile>("/me").await {
        Ok(profile) => info!(level = profile.level, "profile fetch ok"),
        Err(err) => warn!("profile fetch failed: {err}"),
    }

    watch_events(&client, events).await;

    client.logout().await;
    info!("logged out, bye");
    Ok(())
}
