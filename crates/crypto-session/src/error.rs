//! Crypto session error types

use thiserror::Error;

use crate::ChannelState;

/// Cryptographic operation error
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Key agreement failed: {0}")]
    KeyAgreement(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Deliberately carries no detail about which check failed
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("Nonce space exhausted: maximum message count exceeded")]
    NonceExhausted,

    #[error("Session not ready: {operation} requires {required}, session is {actual}")]
    SessionNotReady {
        operation: &'static str,
        required: ChannelState,
        actual: ChannelState,
    },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}

impl CryptoError {
    /// Provider-level failures after which the session should be closed and
    /// the handshake restarted
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::KeyGeneration(_)
                | Self::KeyAgreement(_)
                | Self::KeyDerivation(_)
                | Self::NonceExhausted
        )
    }
}

pub type CryptoResult<T> = Result<T, CryptoError>;
