//! Typed-data digests
//!
//! V1 is the legacy array-of-fields format:
//! `keccak256(keccak256(schema) ‖ keccak256(values))`, where the schema packs
//! every `"<type> <name>"` string and the values are tightly packed by type.
//! V3 and V4 are EIP-712 (`0x1901 ‖ domainSeparator ‖ hashStruct(message)`);
//! V3 does not accept array-typed members.

use ethers_core::types::transaction::eip712::{Eip712, TypedData};
use ethers_core::types::{Address, I256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::keys::keccak256;
use crate::error::{Error, Result};
use super::data_to_bytes;

/// Typed-data encoding version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedDataVersion {
    /// Legacy array of `{type, name, value}` fields
    #[default]
    V1,
    V3,
    V4,
}

impl std::str::FromStr for TypedDataVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "V1" => Ok(Self::V1),
            "V3" => Ok(Self::V3),
            "V4" => Ok(Self::V4),
            other => Err(Error::InvalidInput(format!("Unknown typed data version: {}", other))),
        }
    }
}

/// Options accepted by typed-data signing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataOptions {
    #[serde(default)]
    pub version: TypedDataVersion,
}

/// Compute the digest that gets signed for `payload`
pub fn typed_data_hash(payload: &Value, version: TypedDataVersion) -> Result<[u8; 32]> {
    match version {
        TypedDataVersion::V1 => legacy_typed_data_hash(payload),
        TypedDataVersion::V3 => {
            reject_array_members(payload)?;
            eip712_hash(payload)
        }
        TypedDataVersion::V4 => eip712_hash(payload),
    }
}

fn eip712_hash(payload: &Value) -> Result<[u8; 32]> {
    let typed: TypedData = serde_json::from_value(payload.clone())
        .map_err(|e| Error::Signing(format!("Invalid typed data: {}", e)))?;
    typed
        .encode_eip712()
        .map_err(|e| Error::Signing(e.to_string()))
}

fn reject_array_members(payload: &Value) -> Result<()> {
    let Some(types) = payload.get("types").and_then(Value::as_object) else {
        return Ok(());
    };

    for fields in types.values().filter_map(Value::as_array) {
        for field in fields {
            if let Some(ty) = field.get("type").and_then(Value::as_str) {
                if ty.ends_with(']') {
                    return Err(Error::Signing(
                        "Arrays are unimplemented in V3 typed data; use V4".to_string(),
                    ));
                }
            }
        }
    }

    Ok(())
}

/// Digest of a legacy (V1) typed-data array
pub fn legacy_typed_data_hash(payload: &Value) -> Result<[u8; 32]> {
    let fields = payload
        .as_array()
        .filter(|fields| !fields.is_empty())
        .ok_or_else(|| Error::Signing("Expected a non-empty array of typed fields".to_string()))?;

    let mut schema = Vec::new();
    let mut values = Vec::new();

    for field in fields {
        let ty = field
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Signing("Typed field is missing a type".to_string()))?;
        let name = field
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Signing("Typed field is missing a name".to_string()))?;
        let value = field.get("value").unwrap_or(&Value::Null);

        schema.extend_from_slice(format!("{} {}", ty, name).as_bytes());
        pack(ty, value, false, &mut values)?;
    }

    let mut outer = [0u8; 64];
    outer[..32].copy_from_slice(&keccak256(&schema));
    outer[32..].copy_from_slice(&keccak256(&values));
    Ok(keccak256(&outer))
}

/// Tightly pack `value` as `ty`. Array elements are padded to 32 bytes.
fn pack(ty: &str, value: &Value, in_array: bool, out: &mut Vec<u8>) -> Result<()> {
    if ty.ends_with(']') {
        let open = ty
            .rfind('[')
            .ok_or_else(|| unsupported(ty))?;
        let items = value
            .as_array()
            .ok_or_else(|| Error::Signing(format!("Expected an array for {}", ty)))?;
        for item in items {
            pack(&ty[..open], item, true, out)?;
        }
        return Ok(());
    }

    match ty {
        "string" => out.extend_from_slice(expect_str(ty, value)?.as_bytes()),
        "bytes" => out.extend(data_to_bytes(expect_str(ty, value)?)),
        "bool" => {
            let flag = value
                .as_bool()
                .ok_or_else(|| Error::Signing(format!("Expected a boolean for {}", ty)))?;
            let width = if in_array { 32 } else { 1 };
            out.extend(std::iter::repeat(0u8).take(width - 1));
            out.push(flag as u8);
        }
        "address" => {
            let address: Address = expect_str(ty, value)?
                .parse()
                .map_err(|_| Error::Signing(format!("Invalid address value for {}", ty)))?;
            if in_array {
                out.extend_from_slice(&[0u8; 12]);
            }
            out.extend_from_slice(address.as_bytes());
        }
        _ if ty.starts_with("bytes") => {
            let size = bit_width(ty, "bytes", 0)?;
            if size == 0 || size > 32 {
                return Err(unsupported(ty));
            }
            let bytes = data_to_bytes(expect_str(ty, value)?);
            if bytes.len() > size {
                return Err(Error::Signing(format!("Value too long for {}", ty)));
            }
            let width = if in_array { 32 } else { size };
            out.extend_from_slice(&bytes);
            out.extend(std::iter::repeat(0u8).take(width - bytes.len()));
        }
        _ if ty.starts_with("uint") => {
            let bits = bit_width(ty, "uint", 256)?;
            let number = parse_uint(ty, value)?;
            if number.bits() > bits {
                return Err(Error::Signing(format!("Value out of range for {}", ty)));
            }
            push_word(number, if in_array { 32 } else { bits / 8 }, out);
        }
        _ if ty.starts_with("int") => {
            let bits = bit_width(ty, "int", 256)?;
            let number = parse_int(ty, value)?;
            if bits < 256 {
                let limit = I256::from_raw(U256::one() << (bits - 1));
                if number >= limit || number < -limit {
                    return Err(Error::Signing(format!("Value out of range for {}", ty)));
                }
            }
            push_word(number.into_raw(), if in_array { 32 } else { bits / 8 }, out);
        }
        _ => return Err(unsupported(ty)),
    }

    Ok(())
}

/// Append the low `width` bytes of a big-endian word
fn push_word(word: U256, width: usize, out: &mut Vec<u8>) {
    let mut buf = [0u8; 32];
    word.to_big_endian(&mut buf);
    out.extend_from_slice(&buf[32 - width..]);
}

/// Size suffix of `uint<N>`, `int<N>` or `bytes<N>`
fn bit_width(ty: &str, prefix: &str, default: usize) -> Result<usize> {
    let suffix = &ty[prefix.len()..];
    if suffix.is_empty() {
        return Ok(default);
    }
    let size: usize = suffix.parse().map_err(|_| unsupported(ty))?;
    if prefix != "bytes" && (size == 0 || size > 256 || size % 8 != 0) {
        return Err(unsupported(ty));
    }
    Ok(size)
}

fn parse_uint(ty: &str, value: &Value) -> Result<U256> {
    let invalid = || Error::Signing(format!("Invalid numeric value for {}", ty));
    match value {
        Value::Number(n) => n.as_u64().map(U256::from).ok_or_else(invalid),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16).map_err(|_| invalid()),
            None => U256::from_dec_str(s).map_err(|_| invalid()),
        },
        _ => Err(invalid()),
    }
}

fn parse_int(ty: &str, value: &Value) -> Result<I256> {
    let invalid = || Error::Signing(format!("Invalid numeric value for {}", ty));
    match value {
        Value::Number(n) => n.as_i64().map(I256::from).ok_or_else(invalid),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16)
                .map(I256::from_raw)
                .map_err(|_| invalid()),
            None => I256::from_dec_str(s).map_err(|_| invalid()),
        },
        _ => Err(invalid()),
    }
}

fn expect_str<'a>(ty: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::Signing(format!("Expected a string value for {}", ty)))
}

fn unsupported(ty: &str) -> Error {
    Error::Signing(format!("Unsupported typed data type: {}", ty))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mail() -> Value {
        json!({
            "types": {
                "EIP712Domain": [
                    {"name": "name", "type": "string"},
                    {"name": "version", "type": "string"},
                    {"name": "chainId", "type": "uint256"},
                    {"name": "verifyingContract", "type": "address"}
                ],
                "Person": [
                    {"name": "name", "type": "string"},
                    {"name": "wallet", "type": "address"}
                ],
                "Mail": [
                    {"name": "from", "type": "Person"},
                    {"name": "to", "type": "Person"},
                    {"name": "contents", "type": "string"}
                ]
            },
            "primaryType": "Mail",
            "domain": {
                "name": "Ether Mail",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            },
            "message": {
                "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
                "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
                "contents": "Hello, Bob!"
            }
        })
    }

    #[test]
    fn test_eip712_mail_digest() {
        let digest = typed_data_hash(&mail(), TypedDataVersion::V3).unwrap();
        assert_eq!(
            hex::encode(digest),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
        assert_eq!(digest, typed_data_hash(&mail(), TypedDataVersion::V4).unwrap());
    }

    #[test]
    fn test_v3_rejects_arrays() {
        let mut payload = mail();
        payload["types"]["Mail"][1]["type"] = json!("Person[]");
        assert!(typed_data_hash(&payload, TypedDataVersion::V3).is_err());
    }

    #[test]
    fn test_legacy_hash_depends_on_schema_and_values() {
        let base = json!([{"type": "string", "name": "message", "value": "Hi, Alice!"}]);
        let renamed = json!([{"type": "string", "name": "note", "value": "Hi, Alice!"}]);
        let changed = json!([{"type": "string", "name": "message", "value": "Hi, Bob!"}]);

        let h = legacy_typed_data_hash(&base).unwrap();
        assert_ne!(h, legacy_typed_data_hash(&renamed).unwrap());
        assert_ne!(h, legacy_typed_data_hash(&changed).unwrap());
    }

    #[test]
    fn test_legacy_hash_packing() {
        let payload = json!([
            {"type": "uint8", "name": "n", "value": 1},
            {"type": "bool", "name": "b", "value": true}
        ]);

        let schema = keccak256(b"uint8 nbool b");
        let values = keccak256(&[0x01, 0x01]);
        let mut outer = Vec::new();
        outer.extend_from_slice(&schema);
        outer.extend_from_slice(&values);

        assert_eq!(legacy_typed_data_hash(&payload).unwrap(), keccak256(&outer));
    }

    #[test]
    fn test_legacy_hash_rejects_bad_input() {
        assert!(legacy_typed_data_hash(&json!([])).is_err());
        assert!(legacy_typed_data_hash(&json!({"type": "string"})).is_err());
        assert!(legacy_typed_data_hash(&json!([{"type": "string", "value": "x"}])).is_err());
        assert!(legacy_typed_data_hash(&json!([{"type": "uint8", "name": "n", "value": 256}])).is_err());
        assert!(legacy_typed_data_hash(&json!([{"type": "fixed128x18", "name": "f", "value": 1}])).is_err());
    }

    #[test]
    fn test_legacy_signed_integers() {
        let payload = json!([{"type": "int8", "name": "n", "value": -1}]);
        let schema = keccak256(b"int8 n");
        let values = keccak256(&[0xff]);
        let mut outer = Vec::new();
        outer.extend_from_slice(&schema);
        outer.extend_from_slice(&values);

        assert_eq!(legacy_typed_data_hash(&payload).unwrap(), keccak256(&outer));
        assert!(legacy_typed_data_hash(&json!([{"type": "int8", "name": "n", "value": 128}])).is_err());
    }
}
