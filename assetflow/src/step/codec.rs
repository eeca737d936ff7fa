//! Serialization interface for cached step outputs.
//!
//! The cache store only ever sees bytes plus a type tag; a codec turns a
//! [`StepOutput`] into those bytes and back.

use crate::core::StepOutput;
use crate::errors::CodecError;
use std::fmt::Debug;

/// Encodes and decodes step outputs for persistence.
pub trait ValueCodec: Send + Sync + Debug {
    /// Tag stored next to encoded bytes; decoding only happens when tags match.
    fn type_tag(&self) -> &str;

    /// Encodes an output.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError::Encode`] if the value cannot be represented.
    fn encode(&self, value: &StepOutput) -> Result<Vec<u8>, CodecError>;

    /// Decodes an output.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError::Decode`] if the bytes are not a valid encoding.
    fn decode(&self, bytes: &[u8]) -> Result<StepOutput, CodecError>;
}

/// JSON codec, the default for every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// The type tag written by this codec.
    pub const TAG: &'static str = "json/v1";
}

impl ValueCodec for JsonCodec {
    fn type_tag(&self) -> &str {
        Self::TAG
    }

    fn encode(&self, value: &StepOutput) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode {
            tag: Self::TAG.to_string(),
            message: e.to_string(),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<StepOutput, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode {
            tag: Self::TAG.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_codec_preserves_shape() {
        let codec = JsonCodec;
        let value = StepOutput::named([("train", json!([1, 2])), ("test", json!({"n": 3}))]);
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_json_codec_rejects_garbage() {
        let err = JsonCodec.decode(b"\x00not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode { .. }));
    }
}
