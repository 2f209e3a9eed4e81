//! Signing primitives
//!
//! The keyring never touches ECDSA directly; it hands private keys to a
//! [`Signer`] capability. [`EthersSigner`] is the default implementation.

mod typed_data;

use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Bytes, Signature, H256};
use ethers_core::utils::hash_message;
use ethers_signers::LocalWallet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::keys::{normalize_address, PrivateKey};
use crate::error::{Error, Result};

pub use typed_data::*;

/// Produces ECDSA signatures with a caller-supplied private key
pub trait Signer: Send + Sync {
    /// Sign a 32-byte digest as-is
    fn sign_digest(&self, digest: &[u8], key: &PrivateKey) -> Result<Signature>;

    /// Sign a transaction, filling in the chain id when it is missing
    fn sign_transaction(&self, tx: &mut TypedTransaction, key: &PrivateKey) -> Result<Signature>;

    /// Sign `message` under the `\x19Ethereum Signed Message:\n<len>` prefix
    fn sign_personal_message(&self, message: &[u8], key: &PrivateKey) -> Result<Signature>;

    /// Sign structured data in the given encoding version
    fn sign_typed_data(
        &self,
        key: &PrivateKey,
        payload: &Value,
        version: TypedDataVersion,
    ) -> Result<Signature>;
}

/// [`Signer`] backed by `ethers-signers`
#[derive(Debug, Clone, Copy)]
pub struct EthersSigner {
    chain_id: u64,
}

impl EthersSigner {
    /// Chain id applied to transactions that do not carry one
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    fn wallet(key: &PrivateKey) -> Result<LocalWallet> {
        LocalWallet::from_bytes(key.as_bytes())
            .map_err(|e| Error::Signing(format!("Invalid private key: {}", e)))
    }

    fn sign_hash(key: &PrivateKey, hash: H256) -> Result<Signature> {
        Self::wallet(key)?
            .sign_hash(hash)
            .map_err(|e| Error::Signing(e.to_string()))
    }
}

impl Default for EthersSigner {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Signer for EthersSigner {
    fn sign_digest(&self, digest: &[u8], key: &PrivateKey) -> Result<Signature> {
        if digest.len() != 32 {
            return Err(Error::Signing(format!(
                "Digest must be 32 bytes, got {}",
                digest.len()
            )));
        }
        Self::sign_hash(key, H256::from_slice(digest))
    }

    fn sign_transaction(&self, tx: &mut TypedTransaction, key: &PrivateKey) -> Result<Signature> {
        if tx.chain_id().is_none() {
            tx.set_chain_id(self.chain_id);
        }
        Self::wallet(key)?
            .sign_transaction_sync(tx)
            .map_err(|e| Error::Signing(e.to_string()))
    }

    fn sign_personal_message(&self, message: &[u8], key: &PrivateKey) -> Result<Signature> {
        Self::sign_hash(key, hash_message(message))
    }

    fn sign_typed_data(
        &self,
        key: &PrivateKey,
        payload: &Value,
        version: TypedDataVersion,
    ) -> Result<Signature> {
        let digest = typed_data_hash(payload, version)?;
        Self::sign_hash(key, H256::from(digest))
    }
}

/// A transaction together with the signature produced for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: TypedTransaction,
    pub signature: Signature,
}

impl SignedTransaction {
    /// RLP encoding ready for `eth_sendRawTransaction`
    pub fn raw(&self) -> Bytes {
        self.transaction.rlp_signed(&self.signature)
    }
}

/// Concatenated `r ‖ s ‖ v` as `0x`-prefixed hex
pub fn signature_to_hex(signature: &Signature) -> String {
    format!("0x{}", hex::encode(signature.to_vec()))
}

/// Parse a 65-byte `r ‖ s ‖ v` hex signature
pub fn signature_from_hex(signature: &str) -> Result<Signature> {
    let trimmed = signature.trim();
    let payload = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(payload)
        .map_err(|e| Error::InvalidInput(format!("Invalid signature hex: {}", e)))?;
    Signature::try_from(bytes.as_slice())
        .map_err(|e| Error::InvalidInput(format!("Invalid signature: {}", e)))
}

/// Recover the normalized address that signed `digest`
pub fn recover_digest_signature(digest: &[u8], signature: &str) -> Result<String> {
    if digest.len() != 32 {
        return Err(Error::InvalidInput(format!(
            "Digest must be 32 bytes, got {}",
            digest.len()
        )));
    }
    recover(H256::from_slice(digest), signature)
}

/// Recover the signer of a personal message given as hex (or UTF-8 text)
pub fn recover_personal_signature(data: &str, signature: &str) -> Result<String> {
    recover(hash_message(data_to_bytes(data)), signature)
}

/// Recover the signer of typed data
pub fn recover_typed_signature(
    payload: &Value,
    signature: &str,
    version: TypedDataVersion,
) -> Result<String> {
    recover(H256::from(typed_data_hash(payload, version)?), signature)
}

fn recover(hash: H256, signature: &str) -> Result<String> {
    let address = signature_from_hex(signature)?
        .recover(hash)
        .map_err(|e| Error::Signing(e.to_string()))?;
    Ok(normalize_address(&hex::encode(address.as_bytes())))
}

/// Decode `0x`-prefixed hex, falling back to the raw UTF-8 bytes
pub(crate) fn data_to_bytes(data: &str) -> Vec<u8> {
    if let Some(payload) = data.strip_prefix("0x") {
        let padded = if payload.len() % 2 == 1 {
            format!("0{}", payload)
        } else {
            payload.to_string()
        };
        if let Ok(bytes) = hex::decode(padded) {
            return bytes;
        }
    }
    data.as_bytes().to_vec()
}
