//! Shared Protocol Definitions for the ECDH exchange
//!
//! Wire types exchanged between the two parties of a key exchange and
//! between the transport collaborators (HTTP server, WebSocket client).
//! Nothing in this crate touches key material; cryptographic validation
//! lives in `crypto-session`.

mod channel;
mod encoding;
mod error;
mod jwk;
mod messages;
mod session;

pub use channel::*;
pub use encoding::*;
pub use error::*;
pub use jwk::*;
pub use messages::*;
pub use session::*;

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum accepted JSON body for a single request or channel message
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;
