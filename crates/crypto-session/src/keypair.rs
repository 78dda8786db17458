//! P-256 key pairs and their JWK public form

use exchange_protocol::{
    decode_base64url, encode_base64url, PublicKeyRecord, CURVE_P256, KEY_TYPE_EC,
};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{FieldBytes, PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::{CryptoError, CryptoResult, COORDINATE_SIZE};

/// Scalars drawn from the RNG are rejected when zero or not below the group
/// order; the odds of that are around 2^-32 per draw.
const MAX_GENERATION_ATTEMPTS: usize = 8;

/// Key pair for ephemeral ECDH on P-256
pub struct CurveKeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl CurveKeyPair {
    /// Generate a new key pair from the OS random source
    pub fn generate() -> CryptoResult<Self> {
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let mut bytes = Zeroizing::new([0u8; 32]);
            OsRng
                .try_fill_bytes(&mut bytes[..])
                .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;

            if let Ok(secret) = SecretKey::from_bytes(FieldBytes::from_slice(&bytes[..])) {
                let public = secret.public_key();
                return Ok(Self { secret, public });
            }
        }

        Err(CryptoError::KeyGeneration(
            "random source did not yield a valid scalar".to_string(),
        ))
    }

    /// Get the public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Serialize the public half to the wire record
    pub fn export_public(&self) -> PublicKeyRecord {
        export_public_key(&self.public)
    }
}

impl std::fmt::Debug for CurveKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurveKeyPair")
            .field("public", &self.export_public())
            .finish_non_exhaustive()
    }
}

/// Serialize a P-256 public key as `{kty, crv, x, y}`
pub fn export_public_key(public: &PublicKey) -> PublicKeyRecord {
    let point = public.to_encoded_point(false);
    // Uncompressed encoding of a non-identity point always has both coordinates.
    let x = point.x().map(|x| encode_base64url(x)).unwrap_or_default();
    let y = point.y().map(|y| encode_base64url(y)).unwrap_or_default();
    PublicKeyRecord::p256(x, y)
}

/// Validate a wire record and turn it into a curve point
///
/// Rejects wrong key types, wrong curves, malformed coordinates and points
/// that are not on P-256 (including the identity).
pub fn import_public(record: &PublicKeyRecord) -> CryptoResult<PublicKey> {
    if record.kty != KEY_TYPE_EC {
        return Err(CryptoError::InvalidPublicKey(format!(
            "unsupported key type {:?}",
            record.kty
        )));
    }
    if record.crv != CURVE_P256 {
        return Err(CryptoError::InvalidPublicKey(format!(
            "unsupported curve {:?}",
            record.crv
        )));
    }

    let x = decode_coordinate("x", &record.x)?;
    let y = decode_coordinate("y", &record.y)?;

    let mut sec1 = Vec::with_capacity(1 + 2 * COORDINATE_SIZE);
    sec1.push(0x04);
    sec1.extend_from_slice(&x);
    sec1.extend_from_slice(&y);

    PublicKey::from_sec1_bytes(&sec1)
        .map_err(|_| CryptoError::InvalidPublicKey("point is not on the P-256 curve".to_string()))
}

fn decode_coordinate(field: &'static str, text: &str) -> CryptoResult<Vec<u8>> {
    if text.is_empty() {
        return Err(CryptoError::InvalidPublicKey(format!("missing coordinate {}", field)));
    }
    let bytes =
        decode_base64url(field, text).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    if bytes.len() != COORDINATE_SIZE {
        return Err(CryptoError::InvalidPublicKey(format!(
            "coordinate {} is {} bytes, expected {}",
            field,
            bytes.len(),
            COORDINATE_SIZE
        )));
    }
    Ok(bytes)
}
