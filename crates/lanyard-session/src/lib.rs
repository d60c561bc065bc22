//! Session lifecycle for lanyard clients.
//!
//! This crate owns everything between "the app started" and "the user is
//! in the world": credentials, tokens, the status machine, and the two
//! realtime channels (identity and world). It sits between the transport
//! crate and the surfaces the application actually touches:
//!
//! ```text
//!   ┌───────────────────────────────┐
//!   │  application / UI             │
//!   ├───────────────────────────────┤
//!   │  lanyard-gateway (REST)       │  pulls tokens via TokenSource
//!   ├───────────────────────────────┤
//!   │  lanyard-session  ◄── HERE    │  SessionCoordinator + TokenStore
//!   ├───────────────────────────────┤
//!   │  lanyard-room (channels)      │
//!   ├───────────────────────────────┤
//!   │  lanyard-protocol (frames)    │
//!   └───────────────────────────────┘
//! ```
//!
//! The entry point is [`SessionCoordinator`]: construct it with a
//! connector and a [`TokenStore`], subscribe to its [`SessionEvent`]s,
//! and drive it with `connect_identity` / `login` / `join_world` /
//! `logout`. Everything else in the crate supports that object.

mod auth;
mod config;
mod coordinator;
mod error;
mod events;
mod status;
mod store;

pub use auth::TokenSource;
pub use config::SessionConfig;
pub use coordinator::SessionCoordinator;
pub use error::SessionError;
pub use events::{EventBus, SessionEvent};
pub use status::SessionStatus;
pub use store::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};
