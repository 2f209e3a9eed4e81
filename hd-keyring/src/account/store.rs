//! Derived accounts and their ordered store

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::crypto::keys::{normalize_address, PrivateKey};
use crate::error::{Error, Result};

/// One derived account. The private key is owned here and wiped when the
/// account is dropped.
pub struct Account {
    index: u32,
    address: String,
    private_key: PrivateKey,
}

impl Account {
    pub fn new(index: u32, address: &str, private_key: PrivateKey) -> Self {
        Self {
            index,
            address: normalize_address(address),
            private_key,
        }
    }

    /// Position in the store, equal to the derivation index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Normalized address
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("index", &self.index)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Append-only, index-ordered collection of accounts.
///
/// Indices are contiguous from zero and addresses are unique.
#[derive(Debug, Default)]
pub struct AccountStore {
    accounts: Vec<Account>,
    by_address: HashMap<String, usize>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Index the next appended account must carry
    pub fn next_index(&self) -> u32 {
        self.accounts.len() as u32
    }

    /// Append a batch of accounts. Either every account is appended or, on
    /// a gap or duplicate, none is.
    pub fn extend(&mut self, batch: Vec<Account>) -> Result<()> {
        let mut seen = HashSet::with_capacity(batch.len());
        for (offset, account) in batch.iter().enumerate() {
            let expected = self.next_index() as usize + offset;
            if account.index as usize != expected {
                return Err(Error::KeyDerivation(format!(
                    "Account index {} out of order, expected {}",
                    account.index, expected
                )));
            }
            if self.by_address.contains_key(&account.address)
                || !seen.insert(account.address.as_str())
            {
                return Err(Error::KeyDerivation(format!(
                    "Duplicate account address {}",
                    account.address
                )));
            }
        }

        for account in batch {
            self.by_address.insert(account.address.clone(), self.accounts.len());
            self.accounts.push(account);
        }
        Ok(())
    }

    /// Case-insensitive lookup by address
    pub fn find(&self, address: &str) -> Option<&Account> {
        self.by_address
            .get(&normalize_address(address))
            .map(|&position| &self.accounts[position])
    }

    /// Addresses in index order
    pub fn addresses(&self) -> Vec<String> {
        self.accounts.iter().map(|a| a.address.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(index: u32, address: &str) -> Account {
        Account::new(index, address, PrivateKey::from_bytes([index as u8 + 1; 32]).unwrap())
    }

    #[test]
    fn test_extend_and_find() {
        let mut store = AccountStore::new();
        store
            .extend(vec![account(0, "0xAA00"), account(1, "0xbb11")])
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.addresses(), vec!["0xaa00", "0xbb11"]);
        assert_eq!(store.find("0xaa00").unwrap().index(), 0);
        assert_eq!(store.find("BB11").unwrap().index(), 1);
        assert!(store.find("0xcc22").is_none());
    }

    #[test]
    fn test_rejects_gaps() {
        let mut store = AccountStore::new();
        let err = store.extend(vec![account(1, "0xaa00")]).unwrap_err();
        assert!(matches!(err, Error::KeyDerivation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_rejects_duplicates_atomically() {
        let mut store = AccountStore::new();
        store.extend(vec![account(0, "0xaa00")]).unwrap();

        let err = store
            .extend(vec![account(1, "0xbb11"), account(2, "0xAA00")])
            .unwrap_err();
        assert!(matches!(err, Error::KeyDerivation(_)));
        assert_eq!(store.len(), 1);

        let err = store
            .extend(vec![account(1, "0xcc22"), account(2, "0xcc22")])
            .unwrap_err();
        assert!(matches!(err, Error::KeyDerivation(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_debug_hides_key() {
        let output = format!("{:?}", account(0, "0xaa00"));
        assert!(output.contains("0xaa00"));
        assert!(!output.contains("0101"));
    }
}
