//! Deterministic HD keyring
//!
//! [`HdKeyring`] owns one root key, derived either from a configured
//! mnemonic or from a seed requested from a [`SeedProvider`], and an
//! append-only list of accounts derived from it at `hd_path/i`.
//!
//! Writers (`init`, `add_accounts`, `deserialize`) take an async mutex so
//! index assignment is never duplicated or skipped. Readers only take a
//! short read lock on the state.

mod events;
mod options;
mod provider;

use std::sync::Arc;

use async_trait::async_trait;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::account::{Account, AccountStore};
use crate::crypto::keys::{
    format_address, private_key_to_address, Bip32Deriver, DerivationPath, ExtendedPrivateKey,
    HdDeriver, HARDENED_OFFSET,
};
use crate::crypto::mnemonic::{
    mnemonic_to_seed, Bytes32Codec, MnemonicCodec, MnemonicMode, SeedCodec, SEED_LENGTH,
};
use crate::error::{Error, Result};
use crate::seed_provider::{EncryptionKey, SeedProvider};
use crate::signing::{
    data_to_bytes, signature_to_hex, EthersSigner, SignedTransaction, Signer, TypedDataOptions,
};

pub use events::*;
pub use options::*;
pub use provider::*;

/// Type tag shared by every HD keyring
pub const KEYRING_TYPE: &str = "HD Key Tree";

const EVENT_CAPACITY: usize = 64;

struct KeyringState {
    hd_path: DerivationPath,
    mnemonic_mode: MnemonicMode,
    /// Configured phrase, consumed by `init`
    configured_mnemonic: Option<Zeroizing<String>>,
    number_of_accounts: usize,
    encryption_key: Option<EncryptionKey>,
    /// Phrase the root was derived from, `None` until initialized
    mnemonic: Option<Zeroizing<String>>,
    seed_codec: Option<SeedCodec>,
    root: Option<ExtendedPrivateKey>,
    accounts: AccountStore,
}

impl KeyringState {
    fn from_options(mut options: KeyringOptions) -> Result<Self> {
        let hd_path = match options.hd_path.as_deref() {
            Some(path) => path.parse()?,
            None => DerivationPath::default(),
        };

        Ok(Self {
            hd_path,
            mnemonic_mode: options.mnemonic_mode,
            configured_mnemonic: options.mnemonic.take().map(Zeroizing::new),
            number_of_accounts: options.number_of_accounts.unwrap_or(0),
            encryption_key: options.encryption_key.take(),
            mnemonic: None,
            seed_codec: None,
            root: None,
            accounts: AccountStore::new(),
        })
    }
}

/// Root key material obtained but not yet committed to state
struct PendingRoot {
    root: ExtendedPrivateKey,
    mnemonic: Zeroizing<String>,
    codec: SeedCodec,
    source: RootSource,
}

/// Hierarchical deterministic keyring
pub struct HdKeyring {
    state: RwLock<KeyringState>,
    writer: Mutex<()>,
    seed_provider: Option<Arc<dyn SeedProvider>>,
    signer: Arc<dyn Signer>,
    deriver: Arc<dyn HdDeriver>,
    events: broadcast::Sender<KeyringEvent>,
}

impl HdKeyring {
    /// Create an uninitialized keyring. Call [`HdKeyring::init`] to derive
    /// the root and the configured accounts.
    pub fn new(options: KeyringOptions) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            state: RwLock::new(KeyringState::from_options(options)?),
            writer: Mutex::new(()),
            seed_provider: None,
            signer: Arc::new(EthersSigner::default()),
            deriver: Arc::new(Bip32Deriver),
            events,
        })
    }

    /// Create and initialize a keyring in one step
    pub async fn create(
        options: KeyringOptions,
        seed_provider: Option<Arc<dyn SeedProvider>>,
    ) -> Result<Self> {
        let mut keyring = Self::new(options)?;
        keyring.seed_provider = seed_provider;
        keyring.init().await?;
        Ok(keyring)
    }

    pub fn with_seed_provider(mut self, provider: Arc<dyn SeedProvider>) -> Self {
        self.seed_provider = Some(provider);
        self
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_deriver(mut self, deriver: Arc<dyn HdDeriver>) -> Self {
        self.deriver = deriver;
        self
    }

    /// Receive keyring events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<KeyringEvent> {
        self.events.subscribe()
    }

    pub fn hd_path(&self) -> String {
        self.state.read().hd_path.to_string()
    }

    /// Codec that produced the root seed, once initialized
    pub fn seed_codec(&self) -> Option<SeedCodec> {
        self.state.read().seed_codec
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().root.is_some()
    }

    pub fn account_count(&self) -> usize {
        self.state.read().accounts.len()
    }

    /// Derive the root from the configured mnemonic, if any, then the
    /// configured number of accounts.
    ///
    /// Fails with [`Error::AlreadyInitialized`] once a root exists.
    pub async fn init(&self) -> Result<Vec<String>> {
        let _writer = self.writer.lock().await;
        self.init_locked().await
    }

    /// Reset to `options`, dropping the current root and accounts. Unless
    /// `skip_init` is set the keyring is initialized again right away.
    pub async fn deserialize_with(
        &self,
        options: KeyringOptions,
        skip_init: bool,
    ) -> Result<Vec<String>> {
        let _writer = self.writer.lock().await;

        let fresh = KeyringState::from_options(options)?;
        *self.state.write() = fresh;
        debug!("keyring state reset");
        self.emit(KeyringEvent::Reset);

        if skip_init {
            return Ok(Vec::new());
        }
        self.init_locked().await
    }

    /// Hex-encoded private key of `address`, without prefix
    pub fn export_account(&self, address: &str) -> Result<Zeroizing<String>> {
        self.with_account(address, |account| Ok(account.private_key().to_hex()))
    }

    async fn init_locked(&self) -> Result<Vec<String>> {
        let (phrase, mode, count, hd_path) = {
            let state = self.state.read();
            if state.root.is_some() {
                return Err(Error::AlreadyInitialized);
            }
            (
                state.configured_mnemonic.clone(),
                state.mnemonic_mode,
                state.number_of_accounts,
                state.hd_path.clone(),
            )
        };

        let pending = match phrase {
            Some(phrase) => {
                let (seed, codec) = mnemonic_to_seed(&phrase, mode)?;
                let root = self.deriver.from_master_seed(&seed)?.derive_path(&hd_path)?;
                Some(PendingRoot {
                    root,
                    mnemonic: phrase,
                    codec,
                    source: RootSource::Mnemonic,
                })
            }
            None => None,
        };

        self.add_accounts_locked(count, pending).await
    }

    /// Derive `count` accounts and commit them, together with `pending` when
    /// given, in a single write. Without a pending or committed root the
    /// root is requested from the seed provider first.
    async fn add_accounts_locked(
        &self,
        count: usize,
        mut pending: Option<PendingRoot>,
    ) -> Result<Vec<String>> {
        if count == 0 && pending.is_none() {
            return Ok(Vec::new());
        }

        if pending.is_none() && self.state.read().root.is_none() {
            pending = Some(self.root_from_provider().await?);
        }

        let batch = {
            let state = self.state.read();
            let root = match (&pending, &state.root) {
                (Some(pending), _) => &pending.root,
                (None, Some(root)) => root,
                (None, None) => {
                    return Err(Error::KeyDerivation("Root key is not initialized".to_string()))
                }
            };

            let start = state.accounts.next_index();
            let end = u64::from(start) + count as u64;
            if end > u64::from(HARDENED_OFFSET) {
                return Err(Error::InvalidInput(format!(
                    "Cannot derive {} accounts past index {}",
                    count, start
                )));
            }

            (start..end as u32)
                .map(|index| derive_account(root, index))
                .collect::<Result<Vec<_>>>()?
        };
        let addresses: Vec<String> = batch.iter().map(|a| a.address().to_string()).collect();

        let initialized = pending.as_ref().map(|p| (p.codec, p.source));
        {
            let mut state = self.state.write();
            state.accounts.extend(batch)?;
            if let Some(pending) = pending {
                state.root = Some(pending.root);
                state.mnemonic = Some(pending.mnemonic);
                state.seed_codec = Some(pending.codec);
            }
        }

        if let Some((codec, source)) = initialized {
            info!(
                codec = %codec,
                source = ?source,
                hd_path = %self.hd_path(),
                "keyring initialized"
            );
            self.emit(KeyringEvent::Initialized { codec, source });
        }
        if !addresses.is_empty() {
            debug!(count, total = self.account_count(), "derived accounts");
            self.emit(KeyringEvent::AccountsAdded {
                addresses: addresses.clone(),
            });
        }

        Ok(addresses)
    }

    /// Request a seed and derive the root from it, without touching state
    async fn root_from_provider(&self) -> Result<PendingRoot> {
        let (encryption_key, hd_path) = {
            let state = self.state.read();
            (state.encryption_key.clone(), state.hd_path.clone())
        };
        let encryption_key = encryption_key.ok_or(Error::MissingEncryptionKey)?;
        let provider = self
            .seed_provider
            .as_ref()
            .ok_or(Error::SeedProviderUnavailable)?;

        debug!("requesting wallet seed from provider");
        let seed = provider.get_seed(&encryption_key).await?;
        if seed.len() != SEED_LENGTH {
            return Err(Error::InvalidSeedLength {
                expected: SEED_LENGTH,
                actual: seed.len(),
            });
        }

        let mnemonic = Bytes32Codec.from_seed(&seed)?;
        let root = self.deriver.from_master_seed(&seed)?.derive_path(&hd_path)?;
        Ok(PendingRoot {
            root,
            mnemonic,
            codec: SeedCodec::Bytes32,
            source: RootSource::SeedProvider,
        })
    }

    fn with_account<T>(&self, address: &str, f: impl FnOnce(&Account) -> Result<T>) -> Result<T> {
        let state = self.state.read();
        let account = state
            .accounts
            .find(address)
            .ok_or_else(|| Error::AccountNotFound(address.to_string()))?;
        f(account)
    }

    fn emit(&self, event: KeyringEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

fn derive_account(root: &ExtendedPrivateKey, index: u32) -> Result<Account> {
    let child = root.derive_child(index)?;
    let address = format_address(&private_key_to_address(child.private_key())?);
    Ok(Account::new(index, &address, child.private_key().clone()))
}

#[async_trait]
impl AccountProvider for HdKeyring {
    fn keyring_type(&self) -> &'static str {
        KEYRING_TYPE
    }

    fn serialize(&self) -> SerializedKeyring {
        let state = self.state.read();
        SerializedKeyring {
            mnemonic: state.mnemonic.as_ref().map(|m| m.to_string()),
            number_of_accounts: state.accounts.len(),
            hd_path: state.hd_path.to_string(),
            mnemonic_mode: state.mnemonic_mode,
        }
    }

    async fn deserialize(&self, options: KeyringOptions) -> Result<Vec<String>> {
        self.deserialize_with(options, false).await
    }

    async fn add_accounts(&self, count: usize) -> Result<Vec<String>> {
        let _writer = self.writer.lock().await;
        self.add_accounts_locked(count, None).await
    }

    fn get_accounts(&self) -> Vec<String> {
        self.state.read().accounts.addresses()
    }

    fn sign_transaction(&self, address: &str, mut tx: TypedTransaction) -> Result<SignedTransaction> {
        let signature = self.with_account(address, |account| {
            self.signer.sign_transaction(&mut tx, account.private_key())
        })?;
        Ok(SignedTransaction {
            transaction: tx,
            signature,
        })
    }

    fn sign_message(&self, address: &str, data: &str) -> Result<String> {
        self.with_account(address, |account| {
            let message = data.strip_prefix("0x").unwrap_or(data);
            let digest = hex::decode(message)
                .map_err(|e| Error::InvalidInput(format!("Invalid message hex: {}", e)))?;
            let signature = self.signer.sign_digest(&digest, account.private_key())?;
            Ok(signature_to_hex(&signature))
        })
    }

    fn sign_personal_message(&self, address: &str, data: &str) -> Result<String> {
        self.with_account(address, |account| {
            let signature = self
                .signer
                .sign_personal_message(&data_to_bytes(data), account.private_key())?;
            Ok(signature_to_hex(&signature))
        })
    }

    fn sign_typed_data(
        &self,
        address: &str,
        payload: &Value,
        options: Option<TypedDataOptions>,
    ) -> Result<String> {
        let version = options.unwrap_or_default().version;
        self.with_account(address, |account| {
            let signature = self
                .signer
                .sign_typed_data(account.private_key(), payload, version)?;
            Ok(signature_to_hex(&signature))
        })
    }
}
