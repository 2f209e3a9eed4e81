//! Cryptographic primitives and operations
//!
//! Mnemonic codecs, hierarchical key derivation and address computation used
//! by the keyring.

pub mod mnemonic;
pub mod keys;

pub use mnemonic::*;
pub use keys::*;
