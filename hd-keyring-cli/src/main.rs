//! HD Keyring CLI
//!
//! Derive, provision and sign with deterministic Ethereum accounts from the
//! command line. Results go to stdout as JSON, logs go to stderr.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hd_keyring::crypto::keys::DEFAULT_HD_PATH;
use hd_keyring::signing::recover_personal_signature;
use hd_keyring::{
    AccountProvider, EncryptionKey, HdKeyring, KeyringOptions, MnemonicMode, OsRngSeedProvider,
};

#[derive(Parser)]
#[command(name = "hd-keyring")]
#[command(about = "Deterministic HD account keyring for Ethereum")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive accounts from a mnemonic
    Accounts {
        #[command(flatten)]
        wallet: WalletArgs,

        /// Number of accounts to derive
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Provision a fresh random wallet and print its record
    Generate {
        /// Derivation path template
        #[arg(long, env = "HD_KEYRING_HD_PATH", default_value = DEFAULT_HD_PATH)]
        hd_path: String,

        /// Number of accounts to derive
        #[arg(short, long, default_value = "1")]
        count: usize,
    },

    /// Sign a message with the EIP-191 personal prefix
    SignPersonal {
        #[command(flatten)]
        wallet: WalletArgs,

        /// Index of the signing account
        #[arg(short, long, default_value = "0")]
        index: usize,

        /// Message as 0x-prefixed hex or plain text
        message: String,
    },

    /// Recover the signer of a personal message
    VerifyPersonal {
        /// Message as 0x-prefixed hex or plain text
        message: String,

        /// 65-byte signature as hex
        signature: String,

        /// Fail unless the signer is this address
        #[arg(long)]
        expect: Option<String>,
    },
}

#[derive(clap::Args)]
struct WalletArgs {
    /// Mnemonic phrase
    #[arg(long, env = "HD_KEYRING_MNEMONIC", hide_env_values = true)]
    mnemonic: String,

    /// Derivation path template
    #[arg(long, env = "HD_KEYRING_HD_PATH", default_value = DEFAULT_HD_PATH)]
    hd_path: String,

    /// Mnemonic codec (compat, bytes32, bip39)
    #[arg(long, default_value = "compat")]
    mode: MnemonicMode,
}

impl WalletArgs {
    async fn restore(&self, count: usize) -> anyhow::Result<HdKeyring> {
        let options = KeyringOptions::new()
            .with_mnemonic(self.mnemonic.as_str())
            .with_hd_path(self.hd_path.as_str())
            .with_mnemonic_mode(self.mode)
            .with_number_of_accounts(count);

        HdKeyring::create(options, None)
            .await
            .context("Failed to restore keyring")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Accounts { wallet, count } => {
            let keyring = wallet.restore(count).await?;
            print_json(&json!({
                "hdPath": keyring.hd_path(),
                "seedCodec": keyring.seed_codec(),
                "accounts": keyring.get_accounts(),
            }))?;
        }

        Commands::Generate { hd_path, count } => {
            let options = KeyringOptions::new()
                .with_hd_path(hd_path)
                .with_encryption_key(EncryptionKey::random(32));
            let keyring = HdKeyring::create(options, Some(Arc::new(OsRngSeedProvider))).await?;
            keyring.add_accounts(count).await?;

            info!(count, "provisioned new wallet");
            print_json(&json!({
                "record": keyring.serialize(),
                "accounts": keyring.get_accounts(),
            }))?;
        }

        Commands::SignPersonal {
            wallet,
            index,
            message,
        } => {
            let keyring = wallet.restore(index + 1).await?;
            let accounts = keyring.get_accounts();
            let Some(address) = accounts.get(index) else {
                bail!("No account at index {}", index);
            };

            let signature = keyring.sign_personal_message(address, &message)?;
            print_json(&json!({
                "address": address,
                "signature": signature,
            }))?;
        }

        Commands::VerifyPersonal {
            message,
            signature,
            expect,
        } => {
            let signer = recover_personal_signature(&message, &signature)?;
            if let Some(expected) = expect {
                let expected = hd_keyring::crypto::keys::normalize_address(&expected);
                if expected != signer {
                    bail!("Signature was produced by {}, not {}", signer, expected);
                }
            }
            print_json(&json!({ "signer": signer }))?;
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
