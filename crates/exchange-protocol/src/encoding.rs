//! Base64 helpers for the two encodings used on the wire
//!
//! JWK coordinates use unpadded base64url (RFC 7518 §6.2.1); nonces and
//! ciphertexts use standard padded base64, matching what browser peers
//! produce with `btoa`.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;

use crate::{ProtocolError, ProtocolResult};

/// Encode bytes as unpadded base64url (JWK coordinates)
pub fn encode_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url
pub fn decode_base64url(field: &'static str, text: &str) -> ProtocolResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| ProtocolError::InvalidEncoding {
            field,
            reason: e.to_string(),
        })
}

/// Encode bytes as standard base64 (nonce / ciphertext)
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64
pub fn decode_base64(field: &'static str, text: &str) -> ProtocolResult<Vec<u8>> {
    STANDARD
        .decode(text.trim())
        .map_err(|e| ProtocolError::InvalidEncoding {
            field,
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64url_has_no_padding_or_standard_alphabet() {
        let encoded = encode_base64url(&[0xfb, 0xff, 0xfe]);
        assert_eq!(encoded, "-__-");
        assert!(!encode_base64url(&[1, 2]).ends_with('='));
    }

    #[test]
    fn test_base64url_rejects_padded_input() {
        let err = decode_base64url("x", "AQI=").unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidEncoding { field: "x", .. }));
    }

    #[test]
    fn test_standard_base64_tolerates_surrounding_whitespace() {
        let decoded = decode_base64("iv", " AAECAw== \n").unwrap();
        assert_eq!(decoded, vec![0, 1, 2, 3]);
    }
}
