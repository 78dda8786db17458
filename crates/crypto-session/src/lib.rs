//! Crypto Session - ECDH key exchange with AES-GCM sealed messages
//!
//! Provides P-256 ECDH key agreement, HKDF-SHA256 key derivation and
//! AES-256-GCM authenticated encryption, tied together by [`ChannelSession`].

mod cipher;
mod error;
mod exchange;
mod kdf;
mod keypair;
mod message;
mod nonce;
mod session;

pub use cipher::*;
pub use error::*;
pub use exchange::*;
pub use kdf::*;
pub use keypair::*;
pub use message::*;
pub use nonce::*;
pub use session::*;

/// Nonce size for AES-GCM (96 bits / 12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (128 bits / 16 bytes)
pub const TAG_SIZE: usize = 16;

/// Symmetric key size (256 bits / 32 bytes)
pub const KEY_SIZE: usize = 32;

/// Shared secret size (256 bits / 32 bytes)
pub const SHARED_SECRET_SIZE: usize = 32;

/// Size of one affine P-256 coordinate
pub const COORDINATE_SIZE: usize = 32;

/// HKDF salt shared by both parties
pub const HKDF_SALT: &[u8] = b"ecdh-demo-salt";

/// HKDF info label shared by both parties
pub const HKDF_INFO: &[u8] = b"aes-gcm-key";
