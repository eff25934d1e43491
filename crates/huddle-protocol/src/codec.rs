//! Codec trait and implementations for serializing/deserializing events.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The connection handler doesn't care HOW events are serialized; it just
//! needs something that implements the [`Codec`] trait.
//!
//! We provide [`JsonCodec`], which is what browser clients speak.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task for the lifetime of the server.
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
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use huddle_protocol::{ClientEvent, Codec, JsonCodec, ServerEvent};
///
/// let codec = JsonCodec;
///
/// let event: ClientEvent = codec.decode(br#"{"event":"requestSeat"}"#).unwrap();
/// assert_eq!(event, ClientEvent::RequestSeat);
///
/// let bytes = codec.encode(&ServerEvent::SeatAssigned { seat_index: 0 }).unwrap();
/// assert_eq!(bytes, br#"{"event":"seatAssigned","data":{"seatIndex":0}}"#);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ClientEvent, JoinRoom};

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<ClientEvent, _> = JsonCodec.decode(b"not json at all");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_wrong_shape_returns_error() {
        let result: Result<ClientEvent, _> = JsonCodec.decode(br#"{"name":"Ann"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_join_room_round_trip() {
        let event = ClientEvent::JoinRoom(JoinRoom {
            name: "Ann".into(),
            character: "Student1".into(),
        });
        let bytes = JsonCodec.encode(&event).unwrap();
        let decoded: ClientEvent = JsonCodec.decode(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
