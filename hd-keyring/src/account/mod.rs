//! Account management functionality
//!
//! Accounts derived by the keyring and the append-only store that holds
//! them in derivation order.

mod store;

pub use store::*;
