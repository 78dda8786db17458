//! Public key wire record (JSON Web Key subset)

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, ProtocolResult};

/// The only accepted `kty`
pub const KEY_TYPE_EC: &str = "EC";

/// The only accepted `crv`
pub const CURVE_P256: &str = "P-256";

/// EC public key as exchanged on the wire: `{kty, crv, x, y}`
///
/// Fields are kept as plain strings so that a peer sending the wrong key
/// type or curve is still parsed and can be rejected with a precise error
/// instead of a generic deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    pub kty: String,
    pub crv: String,
    #[serde(default)]
    pub x: String,
    #[serde(default)]
    pub y: String,
}

impl PublicKeyRecord {
    /// Build a P-256 record from already-encoded coordinates
    pub fn p256(x: String, y: String) -> Self {
        Self {
            kty: KEY_TYPE_EC.to_string(),
            crv: CURVE_P256.to_string(),
            x,
            y,
        }
    }

    /// Structural check applied at the transport boundary
    ///
    /// Does not decode the coordinates or check the point; that is the
    /// importer's job.
    pub fn check_shape(&self) -> ProtocolResult<()> {
        if self.kty != KEY_TYPE_EC {
            return Err(ProtocolError::UnsupportedKeyType(self.kty.clone()));
        }
        if self.crv != CURVE_P256 {
            return Err(ProtocolError::UnsupportedCurve(self.crv.clone()));
        }
        if self.x.is_empty() {
            return Err(ProtocolError::MissingField("x"));
        }
        if self.y.is_empty() {
            return Err(ProtocolError::MissingField("y"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_browser_jwk_with_extra_members() {
        let json = r#"{"kty":"EC","crv":"P-256","x":"abc","y":"def","ext":true,"key_ops":[]}"#;
        let record: PublicKeyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record, PublicKeyRecord::p256("abc".into(), "def".into()));
        assert!(record.check_shape().is_ok());
    }

    #[test]
    fn test_shape_rejects_wrong_type_and_curve() {
        let mut record = PublicKeyRecord::p256("a".into(), "b".into());
        record.kty = "OKP".into();
        assert!(matches!(
            record.check_shape(),
            Err(ProtocolError::UnsupportedKeyType(k)) if k == "OKP"
        ));

        let mut record = PublicKeyRecord::p256("a".into(), "b".into());
        record.crv = "P-384".into();
        assert!(matches!(
            record.check_shape(),
            Err(ProtocolError::UnsupportedCurve(_))
        ));
    }

    #[test]
    fn test_shape_rejects_missing_coordinate() {
        let json = r#"{"kty":"EC","crv":"P-256","x":"abc"}"#;
        let record: PublicKeyRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(
            record.check_shape(),
            Err(ProtocolError::MissingField("y"))
        ));
    }
}
