//! Error types for the hd-keyring library

use thiserror::Error;

/// Custom error type for keyring operations
#[derive(Error, Debug)]
pub enum Error {
    /// No mnemonic was configured and no encryption key is available to
    /// request a seed with.
    #[error("Cannot initialize wallet without an encryption key")]
    MissingEncryptionKey,

    /// The execution environment has no seed provider capability.
    #[error("Seed provider is not available")]
    SeedProviderUnavailable,

    #[error("Wallet seed is not {expected} bytes (got {actual})")]
    InvalidSeedLength { expected: usize, actual: usize },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Root key material can only be derived once per keyring.
    #[error("Keyring is already initialized")]
    AlreadyInitialized,

    #[error("Mnemonic error: {0}")]
    Mnemonic(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Seed provider error: {0}")]
    SeedProvider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type for keyring operations
pub type Result<T> = std::result::Result<T, Error>;
