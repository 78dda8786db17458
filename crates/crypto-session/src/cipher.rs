//! AES-256-GCM seal/open with explicit nonces

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};

use crate::{CryptoError, CryptoResult, SymmetricKey, NONCE_SIZE, TAG_SIZE};

fn cipher_for(key: &SymmetricKey) -> CryptoResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Encrypt data with authentication
///
/// The caller guarantees `nonce` has never been used with `key` before.
///
/// Returns: [ciphertext][16-byte auth tag]
pub fn seal(key: &SymmetricKey, nonce: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::Encryption(format!(
            "nonce must be {} bytes, got {}",
            NONCE_SIZE,
            nonce.len()
        )));
    }

    cipher_for(key)?
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypt and verify data
///
/// Every verification failure (tampering, wrong key, wrong nonce) maps to
/// [`CryptoError::AuthenticationFailed`].
pub fn open(key: &SymmetricKey, nonce: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::MalformedCiphertext(format!(
            "nonce must be {} bytes, got {}",
            NONCE_SIZE,
            nonce.len()
        )));
    }
    if ciphertext.len() < TAG_SIZE {
        return Err(CryptoError::MalformedCiphertext(format!(
            "{} bytes is shorter than the {}-byte tag",
            ciphertext.len(),
            TAG_SIZE
        )));
    }

    cipher_for(key)
        .map_err(|_| CryptoError::AuthenticationFailed)?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KEY_SIZE;

    fn key(byte: u8) -> SymmetricKey {
        SymmetricKey::from_bytes([byte; KEY_SIZE])
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let nonce = [7u8; NONCE_SIZE];
        let sealed = seal(&key(1), &nonce, b"hello").unwrap();
        assert_eq!(sealed.len(), 5 + TAG_SIZE);

        let opened = open(&key(1), &nonce, &sealed).unwrap();
        assert_eq!(opened, b"hello");
    }

    #[test]
    fn test_empty_plaintext_is_just_a_tag() {
        let nonce = [0u8; NONCE_SIZE];
        let sealed = seal(&key(2), &nonce, b"").unwrap();
        assert_eq!(sealed.len(), TAG_SIZE);
        assert!(open(&key(2), &nonce, &sealed).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_key_or_nonce_fails_generically() {
        let nonce = [3u8; NONCE_SIZE];
        let sealed = seal(&key(1), &nonce, b"secret").unwrap();

        assert!(matches!(
            open(&key(2), &nonce, &sealed),
            Err(CryptoError::AuthenticationFailed)
        ));
        assert!(matches!(
            open(&key(1), &[4u8; NONCE_SIZE], &sealed),
            Err(CryptoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_short_input_is_malformed() {
        let nonce = [0u8; NONCE_SIZE];
        assert!(matches!(
            open(&key(1), &nonce, &[0u8; TAG_SIZE - 1]),
            Err(CryptoError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn test_bad_nonce_length() {
        assert!(matches!(
            seal(&key(1), &[0u8; 8], b"x"),
            Err(CryptoError::Encryption(_))
        ));
        assert!(matches!(
            open(&key(1), &[0u8; 16], &[0u8; 32]),
            Err(CryptoError::MalformedCiphertext(_))
        ));
    }
}
