//! One round of ECDH public-key exchange

use exchange_protocol::PublicKeyRecord;
use p256::ecdh::diffie_hellman;
use p256::PublicKey;
use zeroize::Zeroizing;

use crate::{import_public, CryptoError, CryptoResult, CurveKeyPair, SHARED_SECRET_SIZE};

/// Raw ECDH output (the x-coordinate of the shared point)
///
/// Never transmitted; wiped when dropped.
pub struct SharedSecret(Zeroizing<[u8; SHARED_SECRET_SIZE]>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Get our public key to send to the peer
pub fn export_own_public_key(pair: &CurveKeyPair) -> PublicKeyRecord {
    pair.export_public()
}

/// Perform Diffie-Hellman key agreement against the peer's record
///
/// The record is fully validated before the private scalar is used.
pub fn derive_shared_secret(
    pair: &CurveKeyPair,
    peer: &PublicKeyRecord,
) -> CryptoResult<SharedSecret> {
    let peer_public = import_public(peer)?;
    derive_shared_secret_with(pair, &peer_public)
}

/// Key agreement against a peer key that has already been imported
pub fn derive_shared_secret_with(
    pair: &CurveKeyPair,
    peer: &PublicKey,
) -> CryptoResult<SharedSecret> {
    let shared = diffie_hellman(pair.secret_key().to_nonzero_scalar(), peer.as_affine());

    let raw = shared.raw_secret_bytes();
    if raw.len() != SHARED_SECRET_SIZE {
        return Err(CryptoError::KeyAgreement(format!(
            "shared secret is {} bytes, expected {}",
            raw.len(),
            SHARED_SECRET_SIZE
        )));
    }

    let mut secret = Zeroizing::new([0u8; SHARED_SECRET_SIZE]);
    secret.copy_from_slice(raw);
    Ok(SharedSecret(secret))
}
