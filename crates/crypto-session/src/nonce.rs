//! Per-direction nonce allocation

use crate::{CryptoError, CryptoResult, NONCE_SIZE};

/// Which side of the handshake we are (affects nonce generation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// We sent the first public key
    Initiator,
    /// We answered with ours
    Responder,
}

impl Role {
    /// Prefix stamped on every nonce this side seals with
    ///
    /// Both sides seal under the same key, so the prefixes must differ.
    pub fn send_prefix(self) -> [u8; 4] {
        match self {
            Role::Initiator => [0x00; 4],
            Role::Responder => [0xFF; 4],
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

/// Monotonic nonce source for one (key, direction)
///
/// Nonce format: [4 bytes direction prefix][8 bytes big-endian counter]
#[derive(Debug)]
pub struct NonceAllocator {
    prefix: [u8; 4],
    counter: u64,
}

impl NonceAllocator {
    pub fn new(role: Role) -> Self {
        Self {
            prefix: role.send_prefix(),
            counter: 0,
        }
    }

    /// Hand out the next nonce; never repeats, never wraps
    pub fn allocate(&mut self) -> CryptoResult<[u8; NONCE_SIZE]> {
        if self.counter == u64::MAX {
            return Err(CryptoError::NonceExhausted);
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce[0..4].copy_from_slice(&self.prefix);
        nonce[4..12].copy_from_slice(&self.counter.to_be_bytes());

        self.counter += 1;

        Ok(nonce)
    }

    /// Number of nonces handed out so far
    pub fn issued(&self) -> u64 {
        self.counter
    }
}
