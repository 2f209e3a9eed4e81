//! Key derivation and management
//!
//! BIP32 derivation of secp256k1 keys and the Ethereum addresses they own.

pub mod derivation;
pub mod ethereum;

pub use derivation::*;
pub use ethereum::*;
