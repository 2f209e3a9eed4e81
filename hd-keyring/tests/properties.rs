//! Property tests for deterministic derivation

use hd_keyring::crypto::keys::{normalize_address, validate_address};
use hd_keyring::crypto::mnemonic::{Bytes32Codec, MnemonicCodec};
use hd_keyring::{AccountProvider, HdKeyring, KeyringOptions};
use proptest::prelude::*;

fn restore(mnemonic: &str, hd_path: &str, count: usize) -> HdKeyring {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime
        .block_on(HdKeyring::create(
            KeyringOptions::new()
                .with_mnemonic(mnemonic)
                .with_hd_path(hd_path)
                .with_number_of_accounts(count),
            None,
        ))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_restore_is_deterministic(
        seed in prop::array::uniform32(any::<u8>()),
        account in 0u32..4,
        count in 1usize..4,
    ) {
        let mnemonic = Bytes32Codec.from_seed(&seed).unwrap();
        let hd_path = format!("m/44'/60'/{}'/0", account);

        let first = restore(&mnemonic, &hd_path, count);
        let second = restore(&mnemonic, &hd_path, count);

        prop_assert_eq!(first.get_accounts(), second.get_accounts());
        prop_assert_eq!(first.get_accounts().len(), count);
        let record = first.serialize();
        prop_assert_eq!(record.mnemonic.as_deref(), Some(mnemonic.as_str()));
    }

    #[test]
    fn prop_addresses_are_normalized(seed in prop::array::uniform32(any::<u8>())) {
        let mnemonic = Bytes32Codec.from_seed(&seed).unwrap();
        let keyring = restore(&mnemonic, "m/44'/60'/0'/0", 2);

        for address in keyring.get_accounts() {
            prop_assert!(validate_address(&address));
            prop_assert_eq!(normalize_address(&address), address.clone());

            let shouted = address.to_uppercase();
            prop_assert!(keyring.export_account(&shouted).is_ok());
        }
    }

    #[test]
    fn prop_normalize_is_idempotent(input in "(0x)?[0-9a-fA-F]{0,40}") {
        let once = normalize_address(&input);
        prop_assert!(once.starts_with("0x"));
        prop_assert_eq!(normalize_address(&once), once.clone());
        prop_assert_eq!(once.to_lowercase(), once);
    }
}
