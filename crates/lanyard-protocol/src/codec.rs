//! Codec trait and implementations for serializing/deserializing frames.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The connection layer doesn't care HOW frames are serialized — it just
//! needs something that implements the [`Codec`] trait. This is the
//! "strategy pattern": we define an interface, and swap implementations.
//!
//! Currently we provide [`JsonCodec`] (human-readable, matches what the
//! rooms speak today). A binary codec could be added later without
//! changing any other code.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because codecs are held inside long-lived
/// async tasks that Tokio may move between threads.
///
/// The methods are generic: `encode` works for any `T: Serialize`,
/// `decode` for any `T: DeserializeOwned`. `DeserializeOwned` (vs plain
/// `Deserialize`) means the result owns all its data and doesn't borrow
/// from the input buffer — the connection drops its receive buffer as
/// soon as decoding finishes.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is what the identity and world rooms actually speak, and it keeps
/// frames inspectable in logs and network tooling.
///
/// ## Example
///
/// ```rust
/// use lanyard_protocol::{ClientFrame, Codec, JsonCodec};
///
/// let codec = JsonCodec;
///
/// let frame = ClientFrame::Ping { sent_at_ms: 5000 };
/// let bytes = codec.encode(&frame).unwrap();
/// let decoded: ClientFrame = codec.decode(&bytes).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorCode, ServerFrame};

    #[test]
    fn test_json_codec_round_trips_server_frame() {
        let codec = JsonCodec;
        let frame = ServerFrame::RequestFailed {
            cid: 4,
            code: ErrorCode::RateLimited,
            message: "slow down".into(),
        };
        let bytes = codec.encode(&frame).unwrap();
        let decoded: ServerFrame = codec.decode(&bytes).unwrap();
        assert_eq!(frame, decoded);
    }

    #[test]
    fn test_json_codec_decode_rejects_truncated_input() {
        let codec = JsonCodec;
        let bytes = codec
            .encode(&ServerFrame::Pong { sent_at_ms: 10 })
            .unwrap();
        let truncated = &bytes[..bytes.len() / 2];
        let result: Result<ServerFrame, _> = codec.decode(truncated);
        assert!(result.is_err());
    }
}
