//! Wire protocol for Lanyard.
//!
//! This crate defines the "language" the client speaks with the identity
//! service, the world service, and the REST backend:
//!
//! - **Types** ([`ClientFrame`], [`ServerFrame`], [`UserProfile`],
//!   [`ErrorCode`], [`ApiEnvelope`]) — the structures that travel on the
//!   wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how frames are converted
//!   to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw bytes) and the
//! session layer (who is logged in, which rooms are live). It knows
//! nothing about connections or state machines — only how messages look.
//!
//! ```text
//! Transport (bytes) → Protocol (frames) → Session (state machine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ApiEnvelope, ClientFrame, ErrorCode, RoomTarget, ServerFrame, UserId,
    UserProfile, PROTOCOL_VERSION,
};
