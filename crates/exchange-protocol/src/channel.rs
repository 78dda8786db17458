//! Messages exchanged over the WebSocket channel

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, ProtocolResult, PublicKeyRecord, WireSealedMessage, MAX_MESSAGE_SIZE, PROTOCOL_VERSION};

/// Channel message, one per WebSocket text frame
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    /// Initiator's public key
    Hello {
        protocol_version: u32,
        public_key: PublicKeyRecord,
    },
    /// Responder's public key; the channel is ready once this is processed
    HelloAck { public_key: PublicKeyRecord },
    /// Sealed payload in either direction
    Sealed(WireSealedMessage),
    /// End the session gracefully
    Close { reason: String },
    /// Error reported by the peer
    Error { message: String },
}

impl ChannelMessage {
    pub fn hello(public_key: PublicKeyRecord) -> Self {
        Self::Hello {
            protocol_version: PROTOCOL_VERSION,
            public_key,
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame, enforcing the size limit first
    pub fn from_json(text: &str) -> ProtocolResult<Self> {
        if text.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: text.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_carries_version_and_tag() {
        let msg = ChannelMessage::hello(PublicKeyRecord::p256("x".into(), "y".into()));
        let json = msg.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "hello");
        assert_eq!(value["protocol_version"], PROTOCOL_VERSION);
        assert_eq!(value["public_key"]["crv"], "P-256");
    }

    #[test]
    fn test_sealed_is_internally_tagged() {
        let json = r#"{"type":"sealed","iv":"AA==","encryptedBase64":"BB=="}"#;
        match ChannelMessage::from_json(json).unwrap() {
            ChannelMessage::Sealed(msg) => {
                assert_eq!(msg.iv, "AA==");
                assert_eq!(msg.ciphertext, "BB==");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let text = "x".repeat(MAX_MESSAGE_SIZE + 1);
        assert!(matches!(
            ChannelMessage::from_json(&text),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
    }
}
