//! Base64 helpers.
//!
//! Pure byte/text conversions with no cryptographic meaning. Used wherever a
//! key, IV or ciphertext is stored in a text field or sent in a text payload.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{CoreError, Result};

/// Encode bytes as standard, padded base64.
pub fn encode_base64(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard, padded base64.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| CoreError::InvalidBase64(e.to_string()))
}

/// Serde adapter carrying `Vec<u8>` fields as base64 strings.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Blob {
///     #[serde(with = "examseal_core::encoding::base64_bytes")]
///     data: Vec<u8>,
/// }
/// ```
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::decode_base64(&text).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter carrying fixed-size byte arrays as base64 strings.
pub mod base64_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = super::decode_base64(&text).map_err(serde::de::Error::custom)?;
        let len = bytes.len();
        bytes.try_into().map_err(|_| {
            serde::de::Error::custom(format!("expected {} bytes, got {}", N, len))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[test]
    fn test_rfc4648_vectors() {
        assert_eq!(encode_base64(b""), "");
        assert_eq!(encode_base64(b"f"), "Zg==");
        assert_eq!(encode_base64(b"fo"), "Zm8=");
        assert_eq!(encode_base64(b"foobar"), "Zm9vYmFy");
        assert_eq!(decode_base64("Zm9vYg==").unwrap(), b"foob");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_base64("not base64!!"),
            Err(CoreError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_decode_tolerates_surrounding_whitespace() {
        assert_eq!(decode_base64("  Zm9v\n").unwrap(), b"foo");
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
        #[serde(with = "base64_array")]
        tag: [u8; 4],
    }

    #[test]
    fn test_serde_adapters() {
        let sample = Sample {
            data: vec![1, 2, 3],
            tag: [9, 8, 7, 6],
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"data":"AQID","tag":"CQgHBg=="}"#);
        assert_eq!(serde_json::from_str::<Sample>(&json).unwrap(), sample);
    }

    #[test]
    fn test_array_adapter_rejects_wrong_length() {
        let json = r#"{"data":"AQID","tag":"AQID"}"#;
        assert!(serde_json::from_str::<Sample>(json).is_err());
    }

    mod properties {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_inverts_encode(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
                prop_assert_eq!(decode_base64(&encode_base64(&bytes)).unwrap(), bytes);
            }

            #[test]
            fn surrounding_whitespace_is_ignored(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
                let padded = format!("  {}\n", encode_base64(&bytes));
                prop_assert_eq!(decode_base64(&padded).unwrap(), bytes);
            }
        }
    }
}
