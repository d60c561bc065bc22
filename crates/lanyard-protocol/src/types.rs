//! Core protocol types for Lanyard's wire format.
//!
//! This module defines every structure that travels "on the wire" between
//! the client and the two real-time rooms it talks to — the Identity Room
//! (credential validation, ticket issuance) and the World Room (the
//! authenticated lobby/gameplay session) — plus the envelope the REST API
//! wraps around its responses.
//!
//! Think of this as the "language" the client and both services speak.

// Serde is Rust's standard serialization framework. The two key traits:
//   - `Serialize`:   "I can be turned INTO bytes/JSON/etc."
//   - `Deserialize`: "I can be created FROM bytes/JSON/etc."
// The `derive` macro auto-generates these implementations for our types.
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;

/// The protocol version this client speaks.
///
/// Sent in every `join_identity` frame so the server can reject clients
/// that are too old to understand the current message set.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user account.
///
/// This is a "newtype wrapper" — a named struct around a primitive. You
/// can't accidentally pass a session id where a `UserId` is expected, and
/// signatures like `fn profile(user: &UserId)` read better than bare
/// `String`s.
///
/// `#[serde(transparent)]` tells serde to serialize this as just the inner
/// string, so `UserId("alice-id")` becomes `"alice-id"` in JSON — the
/// server hands out plain string ids and we wrap them on arrival.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The profile record the identity service returns on login.
///
/// Owned by the session layer and mirrored into the token store so a
/// restarted client can show "welcome back, Alice" before it has spoken
/// to any server. The gameplay payloads behind these numbers (cards,
/// clans, chat) never pass through this crate — only the profile shell
/// the session itself needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user's unique account id.
    pub id: UserId,

    /// The name shown to other players.
    pub display_name: String,

    /// Account level.
    pub level: u32,

    /// Currency balances keyed by currency name ("coins", "gems", ...).
    /// A `BTreeMap` keeps the JSON output in a stable order, which makes
    /// logs and test fixtures deterministic.
    #[serde(default)]
    pub currencies: BTreeMap<String, i64>,
}

// ---------------------------------------------------------------------------
// RoomTarget — which room is this channel bound to?
// ---------------------------------------------------------------------------

/// The logical room a real-time connection is bound to.
///
/// The client holds at most one live connection per target, and the two
/// fail independently: losing the world channel says nothing about the
/// identity channel, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomTarget {
    /// The credential-validation and ticket-issuance room.
    Identity,

    /// The authenticated gameplay/lobby room.
    World,
}

impl fmt::Display for RoomTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::World => write!(f, "world"),
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorCode — structured failure codes
// ---------------------------------------------------------------------------

/// Structured error codes shared by the rooms and the REST API.
///
/// The distinction between `TokenExpired` and `TokenRevoked` is
/// load-bearing: an *expired* access token is the one condition that may
/// trigger a transparent refresh, while a *revoked* or otherwise invalid
/// one must fail straight through to the caller. Collapsing the two into
/// a generic "unauthorized" would turn the refresh-once guarantee into a
/// refresh loop.
///
/// `#[serde(rename_all = "SCREAMING_SNAKE_CASE")]` gives the wire form the
/// servers use (`"TOKEN_EXPIRED"`). The `Other` variant is untagged, so a
/// code this client build doesn't know yet still deserializes instead of
/// failing the whole frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Login identifier/secret pair was wrong.
    InvalidCredentials,

    /// The access token is past its server-enforced expiry.
    /// The only code that may trigger a refresh.
    TokenExpired,

    /// The token was revoked server-side. Never triggers a refresh.
    TokenRevoked,

    /// The world-join ticket aged out before it was used.
    TicketExpired,

    /// The world-join ticket was malformed or already consumed.
    TicketInvalid,

    /// Too many requests; try again later.
    RateLimited,

    /// Server-side failure with no more specific code.
    Internal,

    /// A code this client version doesn't recognize.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "INVALID_CREDENTIALS"),
            Self::TokenExpired => write!(f, "TOKEN_EXPIRED"),
            Self::TokenRevoked => write!(f, "TOKEN_REVOKED"),
            Self::TicketExpired => write!(f, "TICKET_EXPIRED"),
            Self::TicketInvalid => write!(f, "TICKET_INVALID"),
            Self::RateLimited => write!(f, "RATE_LIMITED"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ClientFrame — client → room messages
// ---------------------------------------------------------------------------

/// Messages the client sends to a room.
///
/// `#[serde(tag = "type")]` produces "internally tagged" JSON. Instead of:
///   `{ "login": { "cid": 1, ... } }`
/// it produces:
///   `{ "type": "login", "cid": 1, ... }`
/// which is what the room servers expect and what you'll see in a network
/// inspector.
///
/// The `cid` field on request-style frames is a client-allocated
/// correlation id: the matching reply carries the same `cid`, which is how
/// a reply finds its way back to the caller that is awaiting it on an
/// otherwise fire-and-forget channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    // -- Join handshakes (first frame on a fresh channel) --

    /// Client → Identity Room: "let me in."
    /// `access_token` is present when the client already holds a session
    /// from a previous run or a previous channel (resume / reconnect), so
    /// the room can rebind the channel to that identity.
    JoinIdentity {
        version: u32,
        access_token: Option<String>,
    },

    /// Client → World Room: "let me in, here's my ticket."
    /// The ticket was stamped by the Identity Room moments earlier; the
    /// World Room never sees the long-lived credentials themselves.
    JoinWorld { ticket: String },

    // -- Correlated requests over the identity channel --

    /// "Here are my credentials, log me in."
    Login {
        cid: u64,
        identifier: String,
        secret: String,
    },

    /// "My access token aged out; rotate the pair."
    Refresh { cid: u64, refresh_token: String },

    /// "Stamp me a one-time world-join ticket."
    /// No credential fields: identity is implicit from the authenticated
    /// channel, and the room validates the current access token
    /// server-side before answering.
    TicketRequest { cid: u64 },

    // -- Fire-and-forget --

    /// Best-effort logout notice. The client does not wait for an answer;
    /// local teardown proceeds regardless.
    Logout,

    /// Keep-alive. `sent_at_ms` is the client's local clock so the echoed
    /// pong yields a round-trip time.
    Ping { sent_at_ms: u64 },
}

// ---------------------------------------------------------------------------
// ServerFrame — room → client messages
// ---------------------------------------------------------------------------

/// Messages a room sends to the client.
///
/// Same internally-tagged JSON as [`ClientFrame`]. Frames split into two
/// families:
///
/// - **Correlated replies** carry a `cid` echoing a request
///   ([`ServerFrame::correlation_id`] returns `Some`). The connection
///   layer routes these to whichever caller registered that id.
/// - **Uncorrelated frames** (`cid` absent) are pushed by the room on its
///   own initiative — the ready signal, notices, lobby traffic — and are
///   surfaced as connection events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    // -- Channel lifecycle --

    /// The room-defined ready signal: the join was accepted and the
    /// channel is usable. A bare socket-open is *not* enough — the room
    /// may still reject the join after the socket handshake — so openers
    /// wait for this frame. On the world side it carries the live lobby
    /// snapshot.
    Welcome {
        session_id: String,
        #[serde(default)]
        lobby: Option<serde_json::Value>,
    },

    /// The join was refused after the socket opened (bad ticket, version
    /// mismatch, ...). The channel is dead after this.
    Reject { code: ErrorCode, message: String },

    /// Informational push from the Identity Room right after the welcome:
    /// "nobody is logged in on this channel yet." Purely advisory.
    AuthRequired { message: String },

    // -- Correlated replies --

    /// Login succeeded: the profile plus a fresh credential pair.
    LoginOk {
        cid: u64,
        user: UserProfile,
        access_token: String,
        refresh_token: String,
    },

    /// Refresh succeeded: a rotated credential pair. Both tokens are
    /// replaced together; mixing an old refresh token with a new access
    /// token is never valid.
    RefreshOk {
        cid: u64,
        access_token: String,
        refresh_token: String,
    },

    /// Ticket request succeeded: a short-lived world-join ticket plus a
    /// denormalized profile snapshot the World Room will seed itself with.
    TicketOk {
        cid: u64,
        ticket: String,
        user: UserProfile,
    },

    /// A correlated request failed. One shape for login, refresh, and
    /// ticket failures; the `code` says which rule was violated.
    RequestFailed {
        cid: u64,
        code: ErrorCode,
        message: String,
    },

    // -- Keep-alive --

    /// Echo of a [`ClientFrame::Ping`]; `sent_at_ms` is returned untouched
    /// so the client can compute `now - sent_at_ms` as the round trip.
    Pong { sent_at_ms: u64 },

    // -- Uncorrelated room traffic --

    /// Anything the World Room pushes that isn't part of the session
    /// protocol: lobby rosters, chat, match invitations. The payload is
    /// opaque here and passed through to subscribers untouched.
    Event {
        kind: String,
        payload: serde_json::Value,
    },
}

impl ServerFrame {
    /// The correlation id this frame answers, if it answers one.
    ///
    /// Frames with `Some(cid)` are routed to the pending request that
    /// allocated the id; frames with `None` flow to the connection's
    /// event stream.
    pub fn correlation_id(&self) -> Option<u64> {
        match self {
            Self::LoginOk { cid, .. }
            | Self::RefreshOk { cid, .. }
            | Self::TicketOk { cid, .. }
            | Self::RequestFailed { cid, .. } => Some(*cid),
            _ => None,
        }
    }

    /// A short static label for logging and "unexpected frame" errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::Reject { .. } => "reject",
            Self::AuthRequired { .. } => "auth_required",
            Self::LoginOk { .. } => "login_ok",
            Self::RefreshOk { .. } => "refresh_ok",
            Self::TicketOk { .. } => "ticket_ok",
            Self::RequestFailed { .. } => "request_failed",
            Self::Pong { .. } => "pong",
            Self::Event { .. } => "event",
        }
    }
}

// ---------------------------------------------------------------------------
// ApiEnvelope — the REST response wrapper
// ---------------------------------------------------------------------------

/// The envelope every REST endpoint wraps its response in.
///
/// ```json
/// { "success": true,  "data": { ... } }
/// { "success": false, "code": "TOKEN_EXPIRED", "message": "..." }
/// ```
///
/// `data` is generic so each endpoint's caller names the payload type it
/// expects. The payload fields are all `Option` because no envelope
/// carries every one: error envelopes have no `data`, success envelopes
/// no `code`. A missing optional field parses as `None` — `Option`
/// already deserializes that way, with no `Default` demanded of `T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Builds a success envelope around a payload. Used by test fixtures
    /// and mock servers; real envelopes come from the backend.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            code: None,
            message: None,
        }
    }

    /// Builds a failure envelope with a structured code.
    pub fn fail(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            code: Some(code),
            message: Some(message.into()),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
