//! Outbound keyring events

use serde::Serialize;

use crate::crypto::mnemonic::SeedCodec;

/// Where the root key material came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootSource {
    Mnemonic,
    SeedProvider,
}

/// Notifications published on a keyring's broadcast channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event_type", content = "data")]
pub enum KeyringEvent {
    /// Root key material was derived
    Initialized { codec: SeedCodec, source: RootSource },
    /// New accounts were appended, in derivation order
    AccountsAdded { addresses: Vec<String> },
    /// State was cleared by a restore
    Reset,
}
