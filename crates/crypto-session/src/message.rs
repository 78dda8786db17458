//! Sealed messages and their base64 transport form

use exchange_protocol::{decode_base64, encode_base64, WireSealedMessage};

use crate::{CryptoError, CryptoResult, NONCE_SIZE};

/// Output of [`crate::ChannelSession::seal`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with the authentication tag appended
    pub ciphertext: Vec<u8>,
}

impl SealedMessage {
    pub fn to_wire(&self) -> WireSealedMessage {
        WireSealedMessage {
            iv: encode_base64(&self.nonce),
            ciphertext: encode_base64(&self.ciphertext),
        }
    }

    /// Decode the base64 form; structural problems are `MalformedCiphertext`
    pub fn from_wire(wire: &WireSealedMessage) -> CryptoResult<Self> {
        let nonce_bytes = decode_base64("iv", &wire.iv)
            .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;
        let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
            CryptoError::MalformedCiphertext(format!(
                "nonce must be {} bytes, got {}",
                NONCE_SIZE,
                nonce_bytes.len()
            ))
        })?;

        let ciphertext = decode_base64("encryptedBase64", &wire.ciphertext)
            .map_err(|e| CryptoError::MalformedCiphertext(e.to_string()))?;

        Ok(Self { nonce, ciphertext })
    }
}

impl From<&SealedMessage> for WireSealedMessage {
    fn from(message: &SealedMessage) -> Self {
        message.to_wire()
    }
}

impl TryFrom<&WireSealedMessage> for SealedMessage {
    type Error = CryptoError;

    fn try_from(wire: &WireSealedMessage) -> Result<Self, Self::Error> {
        Self::from_wire(wire)
    }
}
