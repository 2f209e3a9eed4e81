//! Ethereum addresses

use sha3::{Digest, Keccak256};

use crate::error::{Error, Result};
use super::derivation::PrivateKey;

/// Prefix carried by every normalized address
pub const ADDRESS_PREFIX: &str = "0x";

/// Get the 20-byte Ethereum address for a private key
pub fn private_key_to_address(private_key: &PrivateKey) -> Result<[u8; 20]> {
    public_key_to_address(&private_key.public_key_uncompressed()?)
}

/// Get the 20-byte Ethereum address from an uncompressed public key
pub fn public_key_to_address(public_key: &[u8]) -> Result<[u8; 20]> {
    // The public key should be in uncompressed format (65 bytes)
    if public_key.len() != 65 {
        return Err(Error::KeyDerivation("Invalid Ethereum public key length".to_string()));
    }

    // Skip the first byte (0x04) and hash the rest
    let key_hash = keccak256(&public_key[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&key_hash[12..]);
    Ok(address)
}

/// Format address bytes as a normalized hex string
pub fn format_address(address: &[u8]) -> String {
    format!("{}{}", ADDRESS_PREFIX, hex::encode(address))
}

/// Lowercase the hex payload and ensure a single `0x` prefix.
///
/// No length or alphabet validation happens here; lookups simply fail to
/// match malformed input.
pub fn normalize_address(address: &str) -> String {
    let lower = address.trim().to_ascii_lowercase();
    let payload = lower.strip_prefix(ADDRESS_PREFIX).unwrap_or(&lower);
    format!("{}{}", ADDRESS_PREFIX, payload)
}

/// Check that a string is a 20-byte hex address, with or without prefix
pub fn validate_address(address: &str) -> bool {
    let normalized = normalize_address(address);
    match hex::decode(&normalized[ADDRESS_PREFIX.len()..]) {
        Ok(bytes) => bytes.len() == 20,
        Err(_) => false,
    }
}

/// Calculate the Keccak-256 hash of data
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}
