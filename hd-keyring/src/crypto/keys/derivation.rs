//! BIP32 hierarchical key derivation

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// First hardened child index
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Default derivation path template for Ethereum accounts
pub const DEFAULT_HD_PATH: &str = "m/44'/60'/0'/0";

/// A secp256k1 private key, wiped from memory on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    bytes: [u8; 32],
}

impl PrivateKey {
    /// Create a private key from raw bytes, checking it is a valid scalar
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self> {
        SecretKey::from_slice(&bytes)
            .map_err(|e| Error::KeyDerivation(format!("Invalid secret key: {}", e)))?;
        Ok(Self { bytes })
    }

    /// Get the raw private key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Hex encoding without prefix
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }

    fn secret_key(&self) -> Result<SecretKey> {
        SecretKey::from_slice(&self.bytes)
            .map_err(|e| Error::KeyDerivation(format!("Invalid secret key: {}", e)))
    }

    /// Uncompressed SEC1 public key (65 bytes, leading 0x04)
    pub fn public_key_uncompressed(&self) -> Result<[u8; 65]> {
        let secp = Secp256k1::signing_only();
        Ok(PublicKey::from_secret_key(&secp, &self.secret_key()?).serialize_uncompressed())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// A BIP32 node: private key plus chain code
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedPrivateKey {
    private_key: PrivateKey,
    chain_code: [u8; 32],
}

impl ExtendedPrivateKey {
    /// Derive the master node from a seed
    pub fn from_master_seed(seed: &[u8]) -> Result<Self> {
        let mut hmac = Hmac::<Sha512>::new_from_slice(b"Bitcoin seed")
            .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;

        hmac.update(seed);
        let mut result = Zeroizing::new([0u8; 64]);
        result.copy_from_slice(&hmac.finalize().into_bytes());

        Self::from_hmac_output(&result[..])
    }

    /// Derive every component of `path` in turn
    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self> {
        let mut node = self.clone();
        for &index in path.components() {
            node = node.derive_child(index)?;
        }
        Ok(node)
    }

    /// Derive the child at `index`; indices at or above [`HARDENED_OFFSET`]
    /// are hardened
    pub fn derive_child(&self, index: u32) -> Result<Self> {
        let mut data = Zeroizing::new(Vec::with_capacity(37));

        if index >= HARDENED_OFFSET {
            data.push(0);
            data.extend_from_slice(self.private_key.as_bytes());
        } else {
            let secp = Secp256k1::signing_only();
            let public_key = PublicKey::from_secret_key(&secp, &self.private_key.secret_key()?);
            data.extend_from_slice(&public_key.serialize());
        }

        data.extend_from_slice(&index.to_be_bytes());

        let mut hmac = Hmac::<Sha512>::new_from_slice(&self.chain_code)
            .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;
        hmac.update(&data);
        let mut result = Zeroizing::new([0u8; 64]);
        result.copy_from_slice(&hmac.finalize().into_bytes());

        // child = IL + parent (mod n)
        let tweak = SecretKey::from_slice(&result[0..32])
            .map_err(|e| Error::KeyDerivation(format!("Invalid child key: {}", e)))?;
        let child_secret = tweak
            .add_tweak(&self.private_key.secret_key()?.into())
            .map_err(|e| Error::KeyDerivation(format!("Key addition error: {}", e)))?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&result[32..64]);

        Ok(Self {
            private_key: PrivateKey {
                bytes: child_secret.secret_bytes(),
            },
            chain_code,
        })
    }

    /// The node's private key
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    fn from_hmac_output(output: &[u8]) -> Result<Self> {
        let mut secret = [0u8; 32];
        let mut chain_code = [0u8; 32];
        secret.copy_from_slice(&output[0..32]);
        chain_code.copy_from_slice(&output[32..64]);

        let private_key = PrivateKey::from_bytes(secret);
        secret.zeroize();

        Ok(Self {
            private_key: private_key?,
            chain_code,
        })
    }
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedPrivateKey").finish_non_exhaustive()
    }
}

/// Produces root nodes from seed bytes
pub trait HdDeriver: Send + Sync {
    /// Build the master node for `seed`
    fn from_master_seed(&self, seed: &[u8]) -> Result<ExtendedPrivateKey>;
}

/// Standard BIP32 (HMAC-SHA512 keyed with "Bitcoin seed")
#[derive(Debug, Clone, Copy, Default)]
pub struct Bip32Deriver;

impl HdDeriver for Bip32Deriver {
    fn from_master_seed(&self, seed: &[u8]) -> Result<ExtendedPrivateKey> {
        ExtendedPrivateKey::from_master_seed(seed)
    }
}

/// A parsed BIP32 path such as `m/44'/60'/0'/0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath {
    raw: String,
    components: Vec<u32>,
}

impl DerivationPath {
    /// Child indices from the root, hardened ones offset by [`HARDENED_OFFSET`]
    pub fn components(&self) -> &[u32] {
        &self.components
    }
}

impl Default for DerivationPath {
    fn default() -> Self {
        Self {
            raw: DEFAULT_HD_PATH.to_string(),
            components: vec![
                HARDENED_OFFSET + 44,
                HARDENED_OFFSET + 60,
                HARDENED_OFFSET,
                0,
            ],
        }
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(path: &str) -> Result<Self> {
        if path != "m" && !path.starts_with("m/") {
            return Err(Error::KeyDerivation(format!("Invalid derivation path: {}", path)));
        }

        let mut components = Vec::new();
        for component in path.trim_start_matches('m').split('/') {
            if component.is_empty() {
                continue;
            }

            let hardened = component.ends_with('\'') || component.ends_with('h');
            let digits = component.trim_end_matches(['\'', 'h']);
            let index = digits.parse::<u32>().map_err(|_| {
                Error::KeyDerivation(format!("Invalid derivation path component: {}", component))
            })?;
            if index >= HARDENED_OFFSET {
                return Err(Error::KeyDerivation(format!(
                    "Derivation path component out of range: {}",
                    component
                )));
            }

            components.push(if hardened { HARDENED_OFFSET + index } else { index });
        }

        Ok(Self {
            raw: path.to_string(),
            components,
        })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
