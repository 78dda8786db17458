//! Error types for the protocol

use thiserror::Error;

/// Protocol error
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported key type: {0:?}")]
    UnsupportedKeyType(String),

    #[error("Unsupported curve: {0:?}")]
    UnsupportedCurve(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid base64 in {field}: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    #[error("Invalid session ID format")]
    InvalidSessionId,

    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },
}

/// Result type alias for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
