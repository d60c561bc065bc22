//! Error types for the protocol layer.
//!
//! Each crate in Lanyard defines its own error enum. This keeps errors
//! specific and meaningful — when you see a `ProtocolError`, you know the
//! problem is a malformed or out-of-place frame, not networking, not
//! session state.

/// Errors that can occur at the protocol level.
///
/// `#[derive(thiserror::Error)]` auto-generates the `std::error::Error`
/// implementation; the `#[error("...")]` attributes define the message you
/// see when the error reaches a log line.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed — malformed JSON, missing required fields,
    /// or an unknown frame tag.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A frame parsed fine but arrived where the protocol doesn't allow
    /// it — e.g. a `pong` as the answer to a login request. The string
    /// is the offending frame's name.
    #[error("unexpected frame: {0}")]
    UnexpectedFrame(String),
}
