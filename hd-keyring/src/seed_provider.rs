//! Seed provisioning from a trusted boundary
//!
//! When a keyring has no mnemonic it asks an injected [`SeedProvider`] for a
//! fresh 32-byte seed, authenticating the request with an opaque
//! [`EncryptionKey`]. Hosts with a secure enclave or a privileged extension
//! API implement the trait over that channel; [`OsRngSeedProvider`] covers
//! hosts without one.

use std::fmt;

use async_trait::async_trait;
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::mnemonic::SEED_LENGTH;
use crate::error::Result;

/// Opaque key handed to the seed provider, wiped on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey(Vec<u8>);

impl EncryptionKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// A fresh random key of `len` bytes
    pub fn random(len: usize) -> Self {
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for EncryptionKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey({} bytes)", self.0.len())
    }
}

/// Returns wallet seeds from a trusted boundary.
///
/// Implementations answer one request with exactly one seed or an error.
/// The keyring checks the seed length itself.
#[async_trait]
pub trait SeedProvider: Send + Sync {
    async fn get_seed(&self, encryption_key: &EncryptionKey) -> Result<Zeroizing<Vec<u8>>>;
}

/// Seed provider backed by the operating system RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRngSeedProvider;

#[async_trait]
impl SeedProvider for OsRngSeedProvider {
    async fn get_seed(&self, _encryption_key: &EncryptionKey) -> Result<Zeroizing<Vec<u8>>> {
        let mut seed = Zeroizing::new(vec![0u8; SEED_LENGTH]);
        OsRng.fill_bytes(&mut seed);
        Ok(seed)
    }
}
