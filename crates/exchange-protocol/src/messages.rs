//! HTTP request and response bodies

use serde::{Deserialize, Serialize};

use crate::{PublicKeyRecord, SessionId};

/// Request wrapper; browser clients post `{ "data": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Sealed message in its base64 transport form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSealedMessage {
    /// 12-byte nonce, standard base64
    pub iv: String,
    /// Ciphertext with the 16-byte tag appended, standard base64
    #[serde(rename = "encryptedBase64")]
    pub ciphertext: String,
}

/// Response to a key exchange: the server's public key plus the session
/// the derived key is stored under
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub public_key: PublicKeyRecord,
}

/// Ask the server to open a message sealed by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeRequest {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub message: WireSealedMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeResponse {
    pub plaintext: String,
}

/// Ask the server to seal a message for the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeRequest {
    pub session_id: SessionId,
    pub plaintext: String,
}

/// Error body returned with every non-2xx status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Counters exposed by the stats endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Sessions created over HTTP and not yet closed
    pub sessions: usize,
    /// Open WebSocket channels
    pub channels: usize,
    pub sealed: u64,
    pub opened: u64,
}
