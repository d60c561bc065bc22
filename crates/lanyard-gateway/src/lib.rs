//! REST gateway for lanyard clients.
//!
//! The realtime channels carry the session protocol; everything else —
//! profiles, card collections, clan rosters, chat history — lives behind
//! a plain REST API. This crate fronts that API with two behaviors the
//! callers never have to think about:
//!
//! 1. **Bearer auth**: every request carries the current access token,
//!    pulled from the session via the [`TokenSource`] seam.
//! 2. **Refresh-and-replay**: a `401` whose body says `TOKEN_EXPIRED`
//!    triggers one token refresh and one replay of the original request.
//!    The caller sees the final result, never the expiry.
//!
//! Callers go through a resource group:
//!
//! ```no_run
//! # use lanyard_gateway::{GatewayConfig, RequestGateway};
//! # use lanyard_session::{SessionError, TokenSource};
//! # use std::sync::Arc;
//! # struct S;
//! # impl TokenSource for S {
//! #     fn access_token(&self) -> Option<String> { None }
//! #     async fn refresh(&self) -> Result<String, SessionError> { todo!() }
//! # }
//! # async fn demo(source: Arc<S>) -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = RequestGateway::new(source, GatewayConfig::new("https://api.example.com"))?;
//! let profile: serde_json::Value = gateway.users().get("/profile").await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`TokenSource`]: lanyard_session::TokenSource

mod config;
mod error;
mod gateway;
mod resources;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::RequestGateway;
pub use resources::ResourceClient;
