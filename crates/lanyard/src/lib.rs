//! # Lanyard
//!
//! Client SDK for the lanyard session protocol.
//!
//! Lanyard connects an application to a two-service backend: a
//! persistent identity channel that authenticates the user and mints
//! world tickets, a world channel joined with those tickets, and a REST
//! API fronted with automatic bearer auth and token refresh. The SDK
//! owns the whole session lifecycle so the application only reacts to
//! events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lanyard::prelude::*;
//!
//! # async fn demo() -> Result<(), LanyardError> {
//! let client = LanyardClient::builder()
//!     .identity_endpoint("wss://id.example.com/session")
//!     .world_endpoint("wss://world.example.com/session")
//!     .api_base_url("https://api.example.com")
//!     .build()?;
//!
//! let mut events = client.subscribe();
//! client.connect().await?;
//! client.login("alice", "secret").await?;
//! client.join_world().await?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("session event: {event:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{LanyardClient, LanyardClientBuilder};
pub use error::LanyardError;

/// One-stop imports for applications using the SDK.
pub mod prelude {
    pub use crate::client::{LanyardClient, LanyardClientBuilder};
    pub use crate::error::LanyardError;
    pub use lanyard_gateway::{GatewayConfig, GatewayError, RequestGateway, ResourceClient};
    pub use lanyard_protocol::{ErrorCode, RoomTarget, UserId, UserProfile};
    pub use lanyard_room::{RoomConfig, RoomError, WebSocketConnector};
    pub use lanyard_session::{
        FileTokenStore, MemoryTokenStore, SessionConfig, SessionCoordinator, SessionError,
        SessionEvent, SessionStatus, TokenPair, TokenSource, TokenStore,
    };
}
