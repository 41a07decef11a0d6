//! EIP-712 hashing of [`TypedEnvelope`]s.
//!
//! `signing_hash = keccak256(0x19 ++ 0x01 ++ domain_separator ++ message_hash)`
//!
//! The domain separator comes straight from alloy's [`Eip712Domain`]. The
//! message hash is `hashStruct` over the envelope's runtime type table: the
//! user-signed primary types are colon-namespaced
//! (`HyperliquidTransaction:UsdSend`), which alloy's dynamic resolver does not
//! accept as identifiers, so `encodeType`/`encodeData` are evaluated here on
//! alloy primitives. Equivalence with `sol!`-generated structs is covered by
//! the tests below.
//!
//! Nested struct and array fields follow the standard encoding, though every
//! registered table is flat.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use alloy::primitives::{keccak256, Address, B256, I256, U256};
use alloy::sol_types::Eip712Domain;
use tracing::debug;

use crate::envelope::{FieldValue, TypedEnvelope};
use crate::error::{SigningError, SigningResult};
use crate::sign_types::SignField;
use crate::value::ActionValue;

type Types = BTreeMap<String, Vec<SignField>>;

/// `hashStruct(EIP712Domain, domain)`.
pub fn domain_separator(domain: &Eip712Domain) -> B256 {
    domain.separator()
}

/// `hashStruct(primaryType, message)`.
///
/// # Errors
/// Returns `SigningError::TypedData` if a declared field is missing from the
/// message, a value does not fit its declared type, or a type is unknown.
pub fn message_hash(envelope: &TypedEnvelope) -> SigningResult<B256> {
    let fields = lookup(&envelope.types, &envelope.primary_type)?;
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        let value = envelope
            .field(field.name)
            .ok_or_else(|| missing(&envelope.primary_type, field.name))?;
        values.push(Value::from_field(value));
    }
    hash_struct(&envelope.types, &envelope.primary_type, &values)
}

/// Final EIP-712 digest to be signed.
pub fn signing_hash(envelope: &TypedEnvelope) -> SigningResult<B256> {
    let separator = domain_separator(&envelope.domain);
    let message = message_hash(envelope)?;

    let mut buf = [0u8; 66];
    buf[0] = 0x19;
    buf[1] = 0x01;
    buf[2..34].copy_from_slice(separator.as_slice());
    buf[34..66].copy_from_slice(message.as_slice());
    let hash = keccak256(buf);

    debug!(
        primary_type = %envelope.primary_type,
        domain_separator = %separator,
        message_hash = %message,
        signing_hash = %hash,
        "Computed EIP-712 signing hash"
    );
    Ok(hash)
}

/// `encodeType(primaryType)`: the primary struct followed by its referenced
/// struct types in alphabetical order.
pub fn encode_type(types: &Types, primary_type: &str) -> SigningResult<String> {
    let mut deps = BTreeSet::new();
    collect_dependencies(types, primary_type, &mut deps)?;
    deps.remove(primary_type);

    let mut out = format_struct(primary_type, lookup(types, primary_type)?);
    for dep in deps {
        out.push_str(&format_struct(dep, lookup(types, dep)?));
    }
    Ok(out)
}

pub fn type_hash(types: &Types, primary_type: &str) -> SigningResult<B256> {
    Ok(keccak256(encode_type(types, primary_type)?.as_bytes()))
}

fn format_struct(name: &str, fields: &[SignField]) -> String {
    let body: Vec<String> = fields.iter().map(|f| format!("{} {}", f.ty, f.name)).collect();
    format!("{name}({})", body.join(","))
}

fn collect_dependencies<'a>(
    types: &'a Types,
    name: &'a str,
    found: &mut BTreeSet<&'a str>,
) -> SigningResult<()> {
    if !found.insert(name) {
        return Ok(());
    }
    for field in lookup(types, name)? {
        let base = base_type(field.ty);
        if let Some((key, _)) = types.get_key_value(base) {
            collect_dependencies(types, key, found)?;
        }
    }
    Ok(())
}

fn lookup<'a>(types: &'a Types, name: &str) -> SigningResult<&'a [SignField]> {
    types
        .get(name)
        .map(Vec::as_slice)
        .ok_or_else(|| SigningError::TypedData(format!("unknown struct type {name}")))
}

fn missing(type_name: &str, field: &str) -> SigningError {
    SigningError::TypedData(format!("{type_name} is missing field {field}"))
}

fn mismatch(ty: &str, value: Value<'_>) -> SigningError {
    SigningError::TypedData(format!("value {value:?} does not fit type {ty}"))
}

/// Strip array suffixes: `Person[][2]` -> `Person`.
fn base_type(ty: &str) -> &str {
    ty.find('[').map_or(ty, |idx| &ty[..idx])
}

/// A message value, either widened by the envelope builder or raw.
#[derive(Debug, Clone, Copy)]
enum Value<'a> {
    Field(&'a FieldValue),
    Action(&'a ActionValue),
}

impl<'a> Value<'a> {
    fn from_field(value: &'a FieldValue) -> Self {
        match value {
            FieldValue::Raw(v) => Self::Action(v),
            other => Self::Field(other),
        }
    }

    fn as_str(self) -> Option<&'a str> {
        match self {
            Self::Action(ActionValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    fn to_u256(self) -> Option<U256> {
        match self {
            Self::Field(FieldValue::Uint(n)) => Some(*n),
            Self::Field(FieldValue::Int(n)) if !n.is_negative() => Some(n.into_raw()),
            Self::Action(ActionValue::UInt(n)) => Some(U256::from(*n)),
            Self::Action(ActionValue::Str(s)) => U256::from_str(s).ok(),
            _ => None,
        }
    }

    fn to_i256(self) -> Option<I256> {
        match self {
            Self::Field(FieldValue::Int(n)) => Some(*n),
            Self::Field(FieldValue::Uint(n)) => I256::try_from(*n).ok(),
            Self::Action(ActionValue::UInt(n)) => I256::try_from(*n).ok(),
            Self::Action(ActionValue::Int(n)) => I256::try_from(*n).ok(),
            Self::Action(ActionValue::Str(s)) => I256::from_dec_str(s).ok(),
            _ => None,
        }
    }
}

fn hash_struct(types: &Types, type_name: &str, values: &[Value<'_>]) -> SigningResult<B256> {
    let fields = lookup(types, type_name)?;
    let mut buf = Vec::with_capacity(32 * (fields.len() + 1));
    buf.extend_from_slice(type_hash(types, type_name)?.as_slice());
    for (field, value) in fields.iter().zip(values) {
        buf.extend_from_slice(encode_value(types, field.ty, *value)?.as_slice());
    }
    Ok(keccak256(&buf))
}

/// `encodeData` for one field: always exactly one 32-byte word.
fn encode_value(types: &Types, ty: &str, value: Value<'_>) -> SigningResult<B256> {
    if let Some(inner) = ty.strip_suffix(']') {
        return encode_array(types, inner, value);
    }

    if types.contains_key(ty) {
        let Value::Action(ActionValue::Map(map)) = value else {
            return Err(mismatch(ty, value));
        };
        let fields = lookup(types, ty)?;
        let mut nested = Vec::with_capacity(fields.len());
        for field in fields {
            let v = map.get(field.name).ok_or_else(|| missing(ty, field.name))?;
            nested.push(Value::Action(v));
        }
        return hash_struct(types, ty, &nested);
    }

    match ty {
        "string" => value
            .as_str()
            .map(|s| keccak256(s.as_bytes()))
            .ok_or_else(|| mismatch(ty, value)),
        "bytes" => match value {
            Value::Field(FieldValue::Bytes32(b)) => Ok(keccak256(b.as_slice())),
            _ => {
                let bytes = value
                    .as_str()
                    .and_then(decode_hex)
                    .ok_or_else(|| mismatch(ty, value))?;
                Ok(keccak256(&bytes))
            }
        },
        "bool" => match value {
            Value::Action(ActionValue::Bool(b)) => Ok(word(U256::from(u8::from(*b)))),
            _ => Err(mismatch(ty, value)),
        },
        "address" => {
            let addr = value
                .as_str()
                .and_then(|s| Address::from_str(s).ok())
                .ok_or_else(|| mismatch(ty, value))?;
            Ok(addr.into_word())
        }
        _ => {
            if let Some(width) = ty.strip_prefix("bytes") {
                encode_fixed_bytes(ty, width, value)
            } else if let Some(bits) = ty.strip_prefix("uint") {
                let bits = int_width(ty, bits)?;
                let n = value.to_u256().ok_or_else(|| mismatch(ty, value))?;
                if n.bit_len() > bits {
                    return Err(mismatch(ty, value));
                }
                Ok(word(n))
            } else if let Some(bits) = ty.strip_prefix("int") {
                let bits = int_width(ty, bits)?;
                let n = value.to_i256().ok_or_else(|| mismatch(ty, value))?;
                if !fits_signed(n, bits) {
                    return Err(mismatch(ty, value));
                }
                Ok(word(n.into_raw()))
            } else {
                Err(SigningError::TypedData(format!("unsupported type {ty}")))
            }
        }
    }
}

/// `inner` is the array type with its closing bracket removed, e.g. `uint64[3`.
fn encode_array(types: &Types, inner: &str, value: Value<'_>) -> SigningResult<B256> {
    let open = inner
        .rfind('[')
        .ok_or_else(|| SigningError::TypedData(format!("malformed array type {inner}]")))?;
    let (elem_ty, len) = (&inner[..open], &inner[open + 1..]);

    let Value::Action(ActionValue::Seq(items)) = value else {
        return Err(mismatch(inner, value));
    };
    if !len.is_empty() {
        let expected: usize = len
            .parse()
            .map_err(|_| SigningError::TypedData(format!("malformed array type {inner}]")))?;
        if items.len() != expected {
            return Err(mismatch(inner, value));
        }
    }

    let mut buf = Vec::with_capacity(32 * items.len());
    for item in items {
        buf.extend_from_slice(encode_value(types, elem_ty, Value::Action(item))?.as_slice());
    }
    Ok(keccak256(&buf))
}

fn encode_fixed_bytes(ty: &str, width: &str, value: Value<'_>) -> SigningResult<B256> {
    let width: usize = width
        .parse()
        .ok()
        .filter(|w| (1..=32).contains(w))
        .ok_or_else(|| SigningError::TypedData(format!("unsupported type {ty}")))?;

    let bytes = match value {
        Value::Field(FieldValue::Bytes32(b)) => b.to_vec(),
        _ => value
            .as_str()
            .and_then(decode_hex)
            .ok_or_else(|| mismatch(ty, value))?,
    };
    if bytes.len() > width {
        return Err(mismatch(ty, value));
    }
    Ok(B256::right_padding_from(&bytes))
}

fn int_width(ty: &str, bits: &str) -> SigningResult<usize> {
    if bits.is_empty() {
        return Ok(256);
    }
    bits.parse::<usize>()
        .ok()
        .filter(|b| *b > 0 && *b <= 256 && b % 8 == 0)
        .ok_or_else(|| SigningError::TypedData(format!("unsupported type {ty}")))
}

fn fits_signed(n: I256, bits: usize) -> bool {
    if bits == 256 {
        return true;
    }
    let limit = U256::from(1u8) << (bits - 1);
    let magnitude = n.unsigned_abs();
    if n.is_negative() {
        magnitude <= limit
    } else {
        magnitude < limit
    }
}

fn word(n: U256) -> B256 {
    B256::from(n.to_be_bytes::<32>())
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    hex::decode(s.strip_prefix("0x")?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{user_signed_envelope, PhantomAgent};
    use crate::sign_types::{UserSignedKind, USD_SEND_SIGN_TYPES};
    use crate::value::ActionMap;
    use alloy::sol;
    use alloy::sol_types::{eip712_domain, SolStruct, SolValue};

    sol! {
        #[derive(Debug)]
        struct Agent {
            string source;
            bytes32 connectionId;
        }
    }

    fn field(name: &'static str, ty: &'static str) -> SignField {
        SignField { name, ty }
    }

    #[test]
    fn test_agent_hash_matches_sol_struct() {
        let connection_id = B256::repeat_byte(0xab);
        for is_mainnet in [true, false] {
            let phantom = PhantomAgent::new(connection_id, is_mainnet);
            let envelope = phantom.envelope();

            let agent = Agent {
                source: phantom.source.to_string(),
                connectionId: connection_id,
            };
            let domain = eip712_domain! {
                name: "Exchange",
                version: "1",
                chain_id: 1337,
                verifying_contract: Address::ZERO,
            };

            assert_eq!(
                encode_type(&envelope.types, "Agent").unwrap(),
                "Agent(string source,bytes32 connectionId)"
            );
            assert_eq!(message_hash(&envelope).unwrap(), agent.eip712_hash_struct());
            assert_eq!(
                signing_hash(&envelope).unwrap(),
                agent.eip712_signing_hash(&domain)
            );
        }
    }

    #[test]
    fn test_domain_separator_manual() {
        // keccak256(typeHash ++ keccak(name) ++ keccak(version) ++ chainId ++ contract)
        let domain = PhantomAgent::new(B256::ZERO, true).envelope().domain;
        let type_hash = keccak256(
            "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let expected = keccak256(
            (
                type_hash,
                keccak256("Exchange"),
                keccak256("1"),
                U256::from(1337),
                Address::ZERO,
            )
                .abi_encode(),
        );
        assert_eq!(domain_separator(&domain), expected);
    }

    #[test]
    fn test_usd_send_hash_matches_manual_encoding() {
        let action = ActionMap::with_type("usdSend")
            .with("signatureChainId", "0x66eee")
            .with("hyperliquidChain", "Testnet")
            .with("destination", "0x5e9ee1089755c3435139848e47e6635505d5a13a")
            .with("amount", "1")
            .with("time", 1_687_816_341_423u64);
        let envelope = user_signed_envelope(
            &action,
            USD_SEND_SIGN_TYPES,
            UserSignedKind::UsdSend.primary_type(),
        )
        .unwrap();

        let type_hash = keccak256(
            "HyperliquidTransaction:UsdSend(string hyperliquidChain,string destination,string amount,uint64 time)",
        );
        let expected = keccak256(
            (
                type_hash,
                keccak256("Testnet"),
                keccak256("0x5e9ee1089755c3435139848e47e6635505d5a13a"),
                keccak256("1"),
                1_687_816_341_423u64,
            )
                .abi_encode(),
        );
        assert_eq!(message_hash(&envelope).unwrap(), expected);
    }

    #[test]
    fn test_user_signed_type_strings() {
        let expected = [
            (
                UserSignedKind::UsdSend,
                "HyperliquidTransaction:UsdSend(string hyperliquidChain,string destination,string amount,uint64 time)",
            ),
            (
                UserSignedKind::SpotSend,
                "HyperliquidTransaction:SpotSend(string hyperliquidChain,string destination,string token,string amount,uint64 time)",
            ),
            (
                UserSignedKind::Withdraw,
                "HyperliquidTransaction:Withdraw(string hyperliquidChain,string destination,string amount,uint64 time)",
            ),
            (
                UserSignedKind::UsdClassTransfer,
                "HyperliquidTransaction:UsdClassTransfer(string hyperliquidChain,string amount,bool toPerp,uint64 nonce)",
            ),
            (
                UserSignedKind::SendAsset,
                "HyperliquidTransaction:SendAsset(string hyperliquidChain,string destination,string sourceDex,string destinationDex,string token,string amount,string fromSubAccount,uint64 nonce)",
            ),
            (
                UserSignedKind::TokenDelegate,
                "HyperliquidTransaction:TokenDelegate(string hyperliquidChain,address validator,uint64 wei,bool isUndelegate,uint64 nonce)",
            ),
            (
                UserSignedKind::ApproveAgent,
                "HyperliquidTransaction:ApproveAgent(string hyperliquidChain,address agentAddress,string agentName,uint64 nonce)",
            ),
            (
                UserSignedKind::ApproveBuilderFee,
                "HyperliquidTransaction:ApproveBuilderFee(string hyperliquidChain,string maxFeeRate,address builder,uint64 nonce)",
            ),
            (
                UserSignedKind::UserDexAbstraction,
                "HyperliquidTransaction:UserDexAbstraction(string hyperliquidChain,address user,bool enabled,uint64 nonce)",
            ),
            (
                UserSignedKind::ConvertToMultiSigUser,
                "HyperliquidTransaction:ConvertToMultiSigUser(string hyperliquidChain,string signers,uint64 nonce)",
            ),
            (
                UserSignedKind::SendMultiSig,
                "HyperliquidTransaction:SendMultiSig(string hyperliquidChain,bytes32 multiSigActionHash,uint64 nonce)",
            ),
        ];
        assert_eq!(expected.len(), UserSignedKind::ALL.len());

        for (kind, type_string) in expected {
            let types: Types = [(kind.primary_type().to_string(), kind.table().to_vec())]
                .into_iter()
                .collect();
            assert_eq!(encode_type(&types, kind.primary_type()).unwrap(), type_string);
            assert_eq!(
                type_hash(&types, kind.primary_type()).unwrap(),
                keccak256(type_string.as_bytes()),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn test_token_delegate_hash_matches_manual_encoding() {
        let validator = "0x5e9ee1089755c3435139848e47e6635505d5a13a";
        let action = ActionMap::with_type("tokenDelegate")
            .with("hyperliquidChain", "Mainnet")
            .with("validator", validator)
            .with("wei", 100_000_000u64)
            .with("isUndelegate", true)
            .with("nonce", 7u64);
        let kind = UserSignedKind::TokenDelegate;
        let envelope = user_signed_envelope(&action, kind.table(), kind.primary_type()).unwrap();

        let expected = keccak256(
            (
                keccak256(
                    "HyperliquidTransaction:TokenDelegate(string hyperliquidChain,address validator,uint64 wei,bool isUndelegate,uint64 nonce)",
                ),
                keccak256("Mainnet"),
                Address::from_str(validator).unwrap(),
                100_000_000u64,
                true,
                7u64,
            )
                .abi_encode(),
        );
        assert_eq!(message_hash(&envelope).unwrap(), expected);
    }

    #[test]
    fn test_approve_agent_hash_matches_manual_encoding() {
        let agent = "0x5e9ee1089755c3435139848e47e6635505d5a13a";
        let action = ActionMap::with_type("approveAgent")
            .with("signatureChainId", "0x66eee")
            .with("hyperliquidChain", "Testnet")
            .with("agentAddress", agent)
            .with("agentName", "")
            .with("nonce", 1_687_816_341_423u64);
        let kind = UserSignedKind::ApproveAgent;
        let envelope = user_signed_envelope(&action, kind.table(), kind.primary_type()).unwrap();

        let expected = keccak256(
            (
                keccak256(
                    "HyperliquidTransaction:ApproveAgent(string hyperliquidChain,address agentAddress,string agentName,uint64 nonce)",
                ),
                keccak256("Testnet"),
                Address::from_str(agent).unwrap(),
                keccak256(""),
                1_687_816_341_423u64,
            )
                .abi_encode(),
        );
        assert_eq!(message_hash(&envelope).unwrap(), expected);
    }

    #[test]
    fn test_missing_declared_field_fails_to_hash() {
        let action = ActionMap::with_type("usdSend")
            .with("hyperliquidChain", "Testnet")
            .with("time", 1u64);
        let envelope =
            user_signed_envelope(&action, USD_SEND_SIGN_TYPES, "HyperliquidTransaction:UsdSend")
                .unwrap();
        let err = message_hash(&envelope).unwrap_err();
        assert!(err.to_string().contains("destination"), "got {err}");
    }

    #[test]
    fn test_atomic_encodings() {
        let types = Types::new();
        let word = |ty: &str, v: ActionValue| encode_value(&types, ty, Value::Action(&v));

        assert_eq!(word("bool", ActionValue::Bool(true)).unwrap(), B256::with_last_byte(1));
        assert_eq!(word("uint64", ActionValue::UInt(7)).unwrap(), B256::with_last_byte(7));
        assert_eq!(
            word("uint256", ActionValue::from("0x10")).unwrap(),
            B256::with_last_byte(16)
        );
        assert_eq!(word("int8", ActionValue::Int(-1)).unwrap(), B256::repeat_byte(0xff));

        let addr = "0x1719884eb866cb12b2287399b15f7db5e7d775ea";
        let encoded = word("address", ActionValue::from(addr)).unwrap();
        assert_eq!(&encoded[..12], &[0u8; 12]);
        assert_eq!(hex::encode(&encoded[12..]), &addr[2..]);

        let encoded = word("bytes4", ActionValue::from("0xdeadbeef")).unwrap();
        assert_eq!(&encoded[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(&encoded[4..], &[0u8; 28]);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let types = Types::new();
        let word = |ty: &str, v: ActionValue| encode_value(&types, ty, Value::Action(&v));

        assert!(word("uint8", ActionValue::UInt(256)).is_err());
        assert!(word("uint64", ActionValue::Int(-1)).is_err());
        assert!(word("int8", ActionValue::UInt(128)).is_err());
        assert!(word("int8", ActionValue::Int(-128)).is_ok());
        assert!(word("bytes2", ActionValue::from("0xdeadbeef")).is_err());
        assert!(word("string", ActionValue::UInt(1)).is_err());
        assert!(word("address", ActionValue::from("0x1234")).is_err());
        assert!(word("uint7", ActionValue::UInt(1)).is_err());
        assert!(word("fixed128x18", ActionValue::UInt(1)).is_err());
    }

    #[test]
    fn test_nested_struct_and_array() {
        let mut types = Types::new();
        types.insert(
            "Mail".to_string(),
            vec![field("from", "Person"), field("tags", "string[]")],
        );
        types.insert(
            "Person".to_string(),
            vec![field("name", "string"), field("wallet", "address")],
        );

        assert_eq!(
            encode_type(&types, "Mail").unwrap(),
            "Mail(Person from,string[] tags)Person(string name,address wallet)"
        );

        let person = ActionMap::new()
            .with("name", "Cow")
            .with("wallet", "0xcd2a3d9f938e13cd947ec05abc7fe734df8dd826");
        let from = ActionValue::Map(person);
        let tags = ActionValue::from(vec!["a", "b"]);

        let person_hash = {
            let th = keccak256("Person(string name,address wallet)");
            let wallet = Address::from_str("0xcd2a3d9f938e13cd947ec05abc7fe734df8dd826").unwrap();
            keccak256((th, keccak256("Cow"), wallet).abi_encode())
        };
        let mut tag_words = Vec::new();
        tag_words.extend_from_slice(keccak256("a").as_slice());
        tag_words.extend_from_slice(keccak256("b").as_slice());
        let tags_hash = keccak256(&tag_words);
        let expected = keccak256(
            (
                keccak256("Mail(Person from,string[] tags)Person(string name,address wallet)"),
                person_hash,
                tags_hash,
            )
                .abi_encode(),
        );

        let got = hash_struct(&types, "Mail", &[Value::Action(&from), Value::Action(&tags)])
            .unwrap();
        assert_eq!(got, expected);
    }
}
