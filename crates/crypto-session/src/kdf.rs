//! HKDF-SHA256 key derivation

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{CryptoError, CryptoResult, SharedSecret, HKDF_INFO, HKDF_SALT, KEY_SIZE};

/// 256-bit AES-GCM key
///
/// There is deliberately no way to read the bytes back out of this crate.
pub struct SymmetricKey(Zeroizing<[u8; KEY_SIZE]>);

impl SymmetricKey {
    /// Import raw key bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Derive the symmetric key from a shared secret
///
/// Both parties must use identical `salt` and `info`; a mismatch silently
/// yields different keys.
pub fn derive_symmetric_key(
    secret: &SharedSecret,
    salt: &[u8],
    info: &[u8],
) -> CryptoResult<SymmetricKey> {
    hkdf_sha256(secret.as_bytes(), salt, info)
}

/// Derive with the protocol's fixed labels
pub fn derive_session_key(secret: &SharedSecret) -> CryptoResult<SymmetricKey> {
    derive_symmetric_key(secret, HKDF_SALT, HKDF_INFO)
}

fn hkdf_sha256(ikm: &[u8], salt: &[u8], info: &[u8]) -> CryptoResult<SymmetricKey> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(info, &mut okm[..])
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(SymmetricKey(okm))
}
