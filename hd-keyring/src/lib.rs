//! HD Keyring - deterministic Ethereum account keyring
//!
//! This library derives an ordered list of Ethereum accounts from a single
//! root key (BIP39 mnemonic or a provisioned 32-byte seed, then BIP32 along
//! an HD path), signs transactions, messages and typed data for them, and
//! persists itself as a re-derivable record.

pub mod error;
pub mod crypto;
pub mod account;
pub mod signing;
pub mod seed_provider;
pub mod keyring;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use keyring::{
    AccountProvider, HdKeyring, KeyringEvent, KeyringOptions, RootSource, SerializedKeyring,
    KEYRING_TYPE,
};
pub use crypto::mnemonic::{MnemonicMode, SeedCodec};
pub use seed_provider::{EncryptionKey, OsRngSeedProvider, SeedProvider};
pub use signing::{SignedTransaction, TypedDataOptions, TypedDataVersion};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
