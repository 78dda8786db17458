//! Channel session state machine
//!
//! A session owns one side's key pair, the peer's public key, the derived
//! symmetric key and the send-direction nonce allocator. All of it sits
//! behind a single lock, so the handshake transition and nonce allocation
//! are each one critical section and a session can be shared across tasks.

use exchange_protocol::PublicKeyRecord;
use p256::PublicKey;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{
    cipher, derive_session_key, derive_shared_secret_with, import_public, CryptoError, CryptoResult,
    CurveKeyPair, NonceAllocator, Role, SealedMessage, SymmetricKey,
};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Nothing generated yet
    Uninitialized,
    /// Own key pair exists, public key may have been sent
    KeyPairGenerated,
    /// Peer key validated and stored; only ever observed inside
    /// `complete_with`, which moves on to `Ready` under the same lock
    PeerKeyReceived,
    /// Symmetric key derived, seal/open available
    Ready,
    /// Key material dropped
    Closed,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChannelState::Uninitialized => "uninitialized",
            ChannelState::KeyPairGenerated => "key-pair-generated",
            ChannelState::PeerKeyReceived => "peer-key-received",
            ChannelState::Ready => "ready",
            ChannelState::Closed => "closed",
        };
        f.write_str(name)
    }
}

struct Inner {
    state: ChannelState,
    keypair: Option<CurveKeyPair>,
    peer: Option<PublicKey>,
    key: Option<SymmetricKey>,
    send_nonces: NonceAllocator,
    opened: u64,
}

/// One party's end of an exchange-then-encrypt channel
pub struct ChannelSession {
    role: Role,
    inner: Mutex<Inner>,
}

impl ChannelSession {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            inner: Mutex::new(Inner {
                state: ChannelState::Uninitialized,
                keypair: None,
                peer: None,
                key: None,
                send_nonces: NonceAllocator::new(role),
                opened: 0,
            }),
        }
    }

    /// Start a session as the side that sends the first public key
    pub fn new_initiator() -> Self {
        Self::new(Role::Initiator)
    }

    /// Start a session as the side that answers
    pub fn new_responder() -> Self {
        Self::new(Role::Responder)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Get current session state
    pub fn state(&self) -> ChannelState {
        self.inner.lock().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ChannelState::Ready
    }

    /// Generate our key pair and return the public record to send
    pub fn initiate(&self) -> CryptoResult<PublicKeyRecord> {
        let mut inner = self.inner.lock();
        Self::require_fresh(&inner)?;

        let keypair = CurveKeyPair::generate()?;
        let record = keypair.export_public();
        inner.keypair = Some(keypair);
        inner.state = ChannelState::KeyPairGenerated;

        debug!(role = %self.role, "Key pair generated");
        Ok(record)
    }

    /// Complete the handshake with the peer's public key
    ///
    /// On any failure the session stays in `KeyPairGenerated`.
    pub fn complete_with(&self, peer: &PublicKeyRecord) -> CryptoResult<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            ChannelState::KeyPairGenerated => {}
            ChannelState::Uninitialized => {
                return Err(CryptoError::SessionNotReady {
                    operation: "complete_with",
                    required: ChannelState::KeyPairGenerated,
                    actual: ChannelState::Uninitialized,
                })
            }
            ChannelState::Closed => {
                return Err(CryptoError::ProtocolViolation(
                    "session is closed".to_string(),
                ))
            }
            other => {
                return Err(CryptoError::ProtocolViolation(format!(
                    "handshake already completed (session is {})",
                    other
                )))
            }
        }

        let keypair = inner.keypair.as_ref().ok_or_else(|| {
            CryptoError::ProtocolViolation("key pair missing in key-pair-generated state".to_string())
        })?;

        let peer_public = import_public(peer)?;
        let key = Self::session_key(keypair, &peer_public)?;

        inner.peer = Some(peer_public);
        inner.key = Some(key);
        inner.state = ChannelState::Ready;

        info!(role = %self.role, "Session key derived, channel ready");
        Ok(())
    }

    /// Responder convenience: generate our pair, complete with the peer's
    /// record and return our record to send back
    ///
    /// Runs as one transition. The peer key is validated before anything is
    /// generated, and on any failure the session stays `Uninitialized`.
    pub fn respond(&self, peer: &PublicKeyRecord) -> CryptoResult<PublicKeyRecord> {
        let peer_public = import_public(peer)?;

        let mut inner = self.inner.lock();
        Self::require_fresh(&inner)?;

        let keypair = CurveKeyPair::generate()?;
        let key = Self::session_key(&keypair, &peer_public)?;
        let record = keypair.export_public();

        inner.keypair = Some(keypair);
        inner.peer = Some(peer_public);
        inner.key = Some(key);
        inner.state = ChannelState::Ready;

        info!(role = %self.role, "Answered peer key, channel ready");
        Ok(record)
    }

    /// Seal a payload under a freshly allocated nonce
    pub fn seal(&self, plaintext: &[u8]) -> CryptoResult<SealedMessage> {
        let mut inner = self.inner.lock();
        Self::require_ready(&inner, "seal")?;

        let nonce = inner.send_nonces.allocate()?;
        let key = inner.key.as_ref().ok_or_else(|| {
            CryptoError::ProtocolViolation("key missing in ready state".to_string())
        })?;
        let ciphertext = cipher::seal(key, &nonce, plaintext)?;

        debug!(
            role = %self.role,
            sequence = inner.send_nonces.issued() - 1,
            len = plaintext.len(),
            "Sealed message"
        );
        Ok(SealedMessage { nonce, ciphertext })
    }

    /// Open and verify a message sealed by the peer
    pub fn open(&self, message: &SealedMessage) -> CryptoResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        Self::require_ready(&inner, "open")?;

        let key = inner.key.as_ref().ok_or_else(|| {
            CryptoError::ProtocolViolation("key missing in ready state".to_string())
        })?;
        let plaintext = cipher::open(key, &message.nonce, &message.ciphertext)?;
        inner.opened += 1;

        debug!(role = %self.role, len = plaintext.len(), "Opened message");
        Ok(plaintext)
    }

    /// Drop all key material; the session cannot be reused
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.state == ChannelState::Closed {
            return;
        }
        inner.keypair = None;
        inner.peer = None;
        inner.key = None;
        inner.state = ChannelState::Closed;

        info!(role = %self.role, "Session closed");
    }

    /// Messages sealed so far
    pub fn sealed_count(&self) -> u64 {
        self.inner.lock().send_nonces.issued()
    }

    /// Messages successfully opened so far
    pub fn opened_count(&self) -> u64 {
        self.inner.lock().opened
    }

    /// The peer's public key once the handshake has completed
    pub fn peer_public_key(&self) -> Option<PublicKeyRecord> {
        self.inner
            .lock()
            .peer
            .as_ref()
            .map(crate::export_public_key)
    }

    fn require_fresh(inner: &Inner) -> CryptoResult<()> {
        match inner.state {
            ChannelState::Uninitialized => Ok(()),
            ChannelState::Closed => Err(CryptoError::ProtocolViolation(
                "session is closed".to_string(),
            )),
            other => Err(CryptoError::ProtocolViolation(format!(
                "initiate called twice (session is {})",
                other
            ))),
        }
    }

    fn session_key(keypair: &CurveKeyPair, peer: &PublicKey) -> CryptoResult<SymmetricKey> {
        // secret is wiped when it drops at the end of this call
        let secret = derive_shared_secret_with(keypair, peer)?;
        derive_session_key(&secret)
    }

    fn require_ready(inner: &Inner, operation: &'static str) -> CryptoResult<()> {
        match inner.state {
            ChannelState::Ready => Ok(()),
            actual => Err(CryptoError::SessionNotReady {
                operation,
                required: ChannelState::Ready,
                actual,
            }),
        }
    }
}

impl std::fmt::Debug for ChannelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSession")
            .field("role", &self.role)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
