//! Mnemonic phrase codecs
//!
//! Two codecs turn a phrase into root seed material:
//!
//! * [`Bytes32Codec`] maps a 24-word phrase to the 32 bytes of entropy it
//!   encodes, and a 32-byte seed back to its phrase. Seeds provisioned by a
//!   [`SeedProvider`](crate::seed_provider::SeedProvider) are recorded this way.
//! * [`Bip39Codec`] is the standard BIP39 transform (PBKDF2, empty passphrase)
//!   producing a 64-byte seed.
//!
//! The two codecs yield different seeds, and therefore different accounts,
//! for the same phrase. [`MnemonicMode`] selects between them and
//! [`mnemonic_to_seed`] reports which one was used.

use std::fmt;

use bip39::Mnemonic;
use serde::{Deserialize, Serialize};
use tracing::warn;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Size of a provisioned wallet seed
pub const SEED_LENGTH: usize = 32;

/// Word count of a phrase encoding a 32-byte seed
const BYTES32_WORD_COUNT: usize = 24;

/// Identifies the codec that produced a seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeedCodec {
    /// 24-word phrase <-> 32 bytes of entropy
    Bytes32,
    /// Standard BIP39 PBKDF2 seed
    Bip39,
}

impl fmt::Display for SeedCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes32 => f.write_str("bytes32"),
            Self::Bip39 => f.write_str("bip39"),
        }
    }
}

/// How a configured mnemonic is turned into a seed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MnemonicMode {
    /// Try [`Bytes32Codec`] first and fall back to [`Bip39Codec`]
    #[default]
    Compat,
    /// Only [`Bytes32Codec`]
    Bytes32,
    /// Only [`Bip39Codec`]
    Bip39,
}

impl std::str::FromStr for MnemonicMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "compat" => Ok(Self::Compat),
            "bytes32" => Ok(Self::Bytes32),
            "bip39" => Ok(Self::Bip39),
            other => Err(Error::InvalidInput(format!("Unknown mnemonic mode: {}", other))),
        }
    }
}

/// Converts between mnemonic phrases and seed bytes
pub trait MnemonicCodec: Send + Sync {
    /// Derive seed bytes from a phrase
    fn to_seed(&self, phrase: &str) -> Result<Zeroizing<Vec<u8>>>;

    /// Encode seed bytes as a phrase
    fn from_seed(&self, seed: &[u8]) -> Result<Zeroizing<String>>;
}

/// 24-word phrase <-> 32-byte entropy codec
#[derive(Debug, Clone, Copy, Default)]
pub struct Bytes32Codec;

impl MnemonicCodec for Bytes32Codec {
    fn to_seed(&self, phrase: &str) -> Result<Zeroizing<Vec<u8>>> {
        let phrase = normalize_phrase(phrase);
        let words = phrase.split(' ').count();
        if words != BYTES32_WORD_COUNT {
            return Err(Error::Mnemonic(format!(
                "Input words length {} is not {}",
                words, BYTES32_WORD_COUNT
            )));
        }

        let mnemonic = parse(&phrase)?;
        Ok(Zeroizing::new(mnemonic.to_entropy()))
    }

    fn from_seed(&self, seed: &[u8]) -> Result<Zeroizing<String>> {
        if seed.len() != SEED_LENGTH {
            return Err(Error::InvalidSeedLength {
                expected: SEED_LENGTH,
                actual: seed.len(),
            });
        }

        let mnemonic = Mnemonic::from_entropy(seed)
            .map_err(|e| Error::Mnemonic(e.to_string()))?;
        Ok(Zeroizing::new(mnemonic.to_string()))
    }
}

/// Standard BIP39 codec
#[derive(Debug, Clone, Copy, Default)]
pub struct Bip39Codec;

impl MnemonicCodec for Bip39Codec {
    fn to_seed(&self, phrase: &str) -> Result<Zeroizing<Vec<u8>>> {
        let mnemonic = parse(&normalize_phrase(phrase))?;
        let seed = Zeroizing::new(mnemonic.to_seed(""));
        Ok(Zeroizing::new(seed.to_vec()))
    }

    fn from_seed(&self, entropy: &[u8]) -> Result<Zeroizing<String>> {
        let mnemonic = Mnemonic::from_entropy(entropy)
            .map_err(|e| Error::Mnemonic(e.to_string()))?;
        Ok(Zeroizing::new(mnemonic.to_string()))
    }
}

/// Derive seed bytes from a phrase under the given mode.
///
/// Returns the seed together with the codec that produced it. In
/// [`MnemonicMode::Compat`] a phrase the 32-byte codec rejects is retried
/// with the standard BIP39 codec, and the fallback is logged.
pub fn mnemonic_to_seed(
    phrase: &str,
    mode: MnemonicMode,
) -> Result<(Zeroizing<Vec<u8>>, SeedCodec)> {
    match mode {
        MnemonicMode::Bytes32 => Ok((Bytes32Codec.to_seed(phrase)?, SeedCodec::Bytes32)),
        MnemonicMode::Bip39 => Ok((Bip39Codec.to_seed(phrase)?, SeedCodec::Bip39)),
        MnemonicMode::Compat => match Bytes32Codec.to_seed(phrase) {
            Ok(seed) => Ok((seed, SeedCodec::Bytes32)),
            Err(primary) => {
                warn!(reason = %primary, "32-byte mnemonic codec rejected phrase, using BIP39 seed");
                Ok((Bip39Codec.to_seed(phrase)?, SeedCodec::Bip39))
            }
        },
    }
}

/// Trim and collapse whitespace the way phrases are compared
fn normalize_phrase(phrase: &str) -> Zeroizing<String> {
    Zeroizing::new(phrase.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn parse(phrase: &str) -> Result<Mnemonic> {
    Mnemonic::parse_normalized(phrase).map_err(|e| Error::Mnemonic(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE_12: &str = "invite deer vivid fun attract sunny leave endless mutual teach around apology";
    const PHRASE_24: &str = "resist dice daughter wrap diary gain combine museum charge blame lizard master logic coffee local announce connect blast insane spider work march upper swear";

    #[test]
    fn test_bip39_seed_for_12_words() {
        let (seed, codec) = mnemonic_to_seed(PHRASE_12, MnemonicMode::Compat).unwrap();

        assert_eq!(codec, SeedCodec::Bip39);
        assert_eq!(
            seed.as_slice(),
            &[
                198, 240, 17, 131, 9, 253, 8, 111, 11, 216, 253, 20, 246, 146, 126, 6, 226, 140, 128,
                239, 121, 65, 64, 213, 0, 144, 3, 6, 161, 4, 157, 67, 184, 192, 184, 91, 123, 204, 43,
                196, 172, 141, 165, 120, 234, 133, 198, 72, 151, 130, 81, 200, 198, 211, 113, 90, 160,
                140, 12, 163, 17, 37, 115, 40,
            ][..]
        );
    }

    #[test]
    fn test_bytes32_seed_for_24_words() {
        let (seed, codec) = mnemonic_to_seed(PHRASE_24, MnemonicMode::Compat).unwrap();

        assert_eq!(codec, SeedCodec::Bytes32);
        assert_eq!(
            seed.as_slice(),
            &[
                183, 103, 172, 223, 127, 3, 212, 189, 139, 124, 141, 38, 130, 230, 11, 68, 88, 56, 90,
                96, 208, 74, 47, 34, 237, 211, 232, 223, 217, 15, 187, 198,
            ][..]
        );
    }

    #[test]
    fn test_strict_modes() {
        assert!(mnemonic_to_seed(PHRASE_12, MnemonicMode::Bytes32).is_err());

        let (seed, codec) = mnemonic_to_seed(PHRASE_24, MnemonicMode::Bip39).unwrap();
        assert_eq!(codec, SeedCodec::Bip39);
        assert_eq!(seed.len(), 64);
    }

    #[test]
    fn test_from_seed_fixed_points() {
        let zero = Bytes32Codec.from_seed(&[0u8; 32]).unwrap();
        assert_eq!(
            zero.as_str(),
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art"
        );

        let ones = Bytes32Codec.from_seed(&[0xffu8; 32]).unwrap();
        assert_eq!(
            ones.as_str(),
            "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo vote"
        );
    }

    #[test]
    fn test_from_seed_rejects_short_seeds() {
        for len in [16usize, 24] {
            let err = Bytes32Codec.from_seed(&vec![0u8; len]).unwrap_err();
            assert!(matches!(err, Error::InvalidSeedLength { expected: 32, actual } if actual == len));
        }
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let padded = format!("  {}  ", PHRASE_24.replace(' ', "   "));
        let (a, _) = mnemonic_to_seed(&padded, MnemonicMode::Bytes32).unwrap();
        let (b, _) = mnemonic_to_seed(PHRASE_24, MnemonicMode::Bytes32).unwrap();
        assert_eq!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_invalid_phrase() {
        let invalid = "invalid mnemonic phrase test test test test test test test test test";
        assert!(mnemonic_to_seed(invalid, MnemonicMode::Compat).is_err());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("compat".parse::<MnemonicMode>().unwrap(), MnemonicMode::Compat);
        assert_eq!("BIP39".parse::<MnemonicMode>().unwrap(), MnemonicMode::Bip39);
        assert!("niceware".parse::<MnemonicMode>().is_err());
    }
}
