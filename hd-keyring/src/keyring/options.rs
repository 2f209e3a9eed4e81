//! Keyring configuration and the persisted record

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::mnemonic::MnemonicMode;
use crate::seed_provider::EncryptionKey;

/// Configuration a keyring is created or restored from
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyringOptions {
    /// Phrase to derive the root from; without one the root comes from the
    /// seed provider on the first `add_accounts`
    #[serde(default)]
    pub mnemonic: Option<String>,
    /// Accounts to derive during initialization
    #[serde(default)]
    pub number_of_accounts: Option<usize>,
    /// Derivation path template, `m/44'/60'/0'/0` when absent
    #[serde(default)]
    pub hd_path: Option<String>,
    #[serde(default)]
    pub mnemonic_mode: MnemonicMode,
    /// Key presented to the seed provider. Never serialized.
    #[serde(skip)]
    pub encryption_key: Option<EncryptionKey>,
}

impl KeyringOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mnemonic(mut self, mnemonic: impl Into<String>) -> Self {
        self.mnemonic = Some(mnemonic.into());
        self
    }

    pub fn with_number_of_accounts(mut self, count: usize) -> Self {
        self.number_of_accounts = Some(count);
        self
    }

    pub fn with_hd_path(mut self, hd_path: impl Into<String>) -> Self {
        self.hd_path = Some(hd_path.into());
        self
    }

    pub fn with_mnemonic_mode(mut self, mode: MnemonicMode) -> Self {
        self.mnemonic_mode = mode;
        self
    }

    pub fn with_encryption_key(mut self, key: impl Into<EncryptionKey>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }
}

impl fmt::Debug for KeyringOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyringOptions")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("number_of_accounts", &self.number_of_accounts)
            .field("hd_path", &self.hd_path)
            .field("mnemonic_mode", &self.mnemonic_mode)
            .field("encryption_key", &self.encryption_key)
            .finish()
    }
}

impl Drop for KeyringOptions {
    fn drop(&mut self) {
        if let Some(ref mut mnemonic) = self.mnemonic {
            mnemonic.zeroize();
        }
    }
}

/// The re-derivable snapshot a keyring persists
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedKeyring {
    pub mnemonic: Option<String>,
    pub number_of_accounts: usize,
    pub hd_path: String,
    /// Only written when a non-default mode produced the root
    #[serde(default, skip_serializing_if = "is_compat")]
    pub mnemonic_mode: MnemonicMode,
}

fn is_compat(mode: &MnemonicMode) -> bool {
    *mode == MnemonicMode::Compat
}

impl SerializedKeyring {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Debug for SerializedKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializedKeyring")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("number_of_accounts", &self.number_of_accounts)
            .field("hd_path", &self.hd_path)
            .field("mnemonic_mode", &self.mnemonic_mode)
            .finish()
    }
}

impl Drop for SerializedKeyring {
    fn drop(&mut self) {
        if let Some(ref mut mnemonic) = self.mnemonic {
            mnemonic.zeroize();
        }
    }
}

impl From<SerializedKeyring> for KeyringOptions {
    fn from(mut record: SerializedKeyring) -> Self {
        let mut options = KeyringOptions::new()
            .with_number_of_accounts(record.number_of_accounts)
            .with_hd_path(std::mem::take(&mut record.hd_path))
            .with_mnemonic_mode(record.mnemonic_mode);
        options.mnemonic = record.mnemonic.take();
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_shape() {
        let record = SerializedKeyring {
            mnemonic: Some("abandon art".to_string()),
            number_of_accounts: 2,
            hd_path: "m/44'/60'/0'/0".to_string(),
            mnemonic_mode: MnemonicMode::Compat,
        };

        let value: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "mnemonic": "abandon art",
                "numberOfAccounts": 2,
                "hdPath": "m/44'/60'/0'/0"
            })
        );
        assert_eq!(SerializedKeyring::from_json(&record.to_json().unwrap()).unwrap(), record);
    }

    #[test]
    fn test_record_with_null_mnemonic() {
        let record = SerializedKeyring::from_json(
            r#"{"mnemonic":null,"numberOfAccounts":0,"hdPath":"m/44'/60'/0'/0"}"#,
        )
        .unwrap();
        assert!(record.mnemonic.is_none());
        assert_eq!(record.mnemonic_mode, MnemonicMode::Compat);
    }

    #[test]
    fn test_options_from_record() {
        let record = SerializedKeyring {
            mnemonic: Some("abandon art".to_string()),
            number_of_accounts: 3,
            hd_path: "m/44'/60'/0'/1".to_string(),
            mnemonic_mode: MnemonicMode::Bip39,
        };

        let options = KeyringOptions::from(record);
        assert_eq!(options.mnemonic.as_deref(), Some("abandon art"));
        assert_eq!(options.number_of_accounts, Some(3));
        assert_eq!(options.hd_path.as_deref(), Some("m/44'/60'/0'/1"));
        assert_eq!(options.mnemonic_mode, MnemonicMode::Bip39);
        assert!(options.encryption_key.is_none());
    }

    #[test]
    fn test_debug_redacts_mnemonic() {
        let options = KeyringOptions::new().with_mnemonic("secret words here");
        assert!(!format!("{:?}", options).contains("secret"));
    }
}
