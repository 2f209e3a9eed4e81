//! The account-provider capability

use async_trait::async_trait;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use serde_json::Value;

use crate::error::Result;
use crate::signing::{SignedTransaction, TypedDataOptions};
use super::options::{KeyringOptions, SerializedKeyring};

/// Something that owns accounts: it enumerates them, signs for them and
/// persists itself as a re-derivable record.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Constant tag identifying the keyring kind
    fn keyring_type(&self) -> &'static str;

    fn serialize(&self) -> SerializedKeyring;

    /// Reset to the given configuration and initialize from it
    async fn deserialize(&self, options: KeyringOptions) -> Result<Vec<String>>;

    /// Derive `count` further accounts, returning their addresses
    async fn add_accounts(&self, count: usize) -> Result<Vec<String>>;

    async fn add_account(&self) -> Result<Vec<String>> {
        self.add_accounts(1).await
    }

    /// Normalized addresses in derivation order
    fn get_accounts(&self) -> Vec<String>;

    fn sign_transaction(&self, address: &str, tx: TypedTransaction) -> Result<SignedTransaction>;

    /// Legacy `eth_sign`: sign the hex-encoded 32-byte digest as-is
    fn sign_message(&self, address: &str, data: &str) -> Result<String>;

    /// EIP-191 `personal_sign`
    fn sign_personal_message(&self, address: &str, data: &str) -> Result<String>;

    /// Typed data, V1 unless `options` selects another version
    fn sign_typed_data(
        &self,
        address: &str,
        payload: &Value,
        options: Option<TypedDataOptions>,
    ) -> Result<String>;
}
