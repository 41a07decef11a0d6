//! EIP-712 envelopes for the two signing variants.
//!
//! - Exchange (L1) actions: the action hash travels inside a phantom `Agent`
//!   struct under the `Exchange` domain (chain id 1337).
//! - User-signed actions: the action's own fields, selected and ordered by a
//!   [`SignTypeTable`], under the `HyperliquidSignTransaction` domain whose
//!   chain id comes from the action's `signatureChainId`.

use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, I256, U256};
use alloy::sol_types::{eip712_domain, Eip712Domain};
use serde_json::{json, Value as JsonValue};

use crate::error::{SigningError, SigningResult};
use crate::sign_types::{
    SignField, SignTypeTable, AGENT_PRIMARY_TYPE, AGENT_SIGN_TYPES, EIP712_DOMAIN_FIELDS,
    EIP712_DOMAIN_TYPE,
};
use crate::value::{ActionMap, ActionValue};

/// EIP-712 domain constants for exchange actions.
pub const EXCHANGE_DOMAIN_NAME: &str = "Exchange";
pub const EXCHANGE_DOMAIN_VERSION: &str = "1";
pub const EXCHANGE_CHAIN_ID: u64 = 1337;

/// EIP-712 domain constants for user-signed actions.
pub const USER_SIGNED_DOMAIN_NAME: &str = "HyperliquidSignTransaction";
pub const USER_SIGNED_DOMAIN_VERSION: &str = "1";
pub const DEFAULT_SIGNATURE_CHAIN_ID: &str = "0x66eee";

pub const VERIFYING_CONTRACT: Address = Address::ZERO;

/// Phantom agent source tags.
pub const MAINNET_SOURCE: &str = "a";
pub const TESTNET_SOURCE: &str = "b";

/// Domain for exchange actions.
pub fn exchange_domain() -> Eip712Domain {
    eip712_domain! {
        name: EXCHANGE_DOMAIN_NAME,
        version: EXCHANGE_DOMAIN_VERSION,
        chain_id: EXCHANGE_CHAIN_ID,
        verifying_contract: VERIFYING_CONTRACT,
    }
}

/// Domain for user-signed actions on the given signature chain.
pub fn user_signed_domain(chain_id: u64) -> Eip712Domain {
    eip712_domain! {
        name: USER_SIGNED_DOMAIN_NAME,
        version: USER_SIGNED_DOMAIN_VERSION,
        chain_id: chain_id,
        verifying_contract: VERIFYING_CONTRACT,
    }
}

/// Parse a `signatureChainId` such as `"0x66eee"`.
pub fn parse_chain_id(input: &str) -> SigningResult<u64> {
    let invalid = || SigningError::InvalidChainId {
        input: input.to_string(),
    };
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(invalid)?;
    u64::from_str_radix(digits, 16).map_err(|_| invalid())
}

/// A message field value, after integer widening.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Uint(U256),
    Int(I256),
    Bytes32(B256),
    /// Copied verbatim from the action.
    Raw(ActionValue),
}

impl FieldValue {
    /// Widen a value according to its declared EIP-712 type.
    ///
    /// Integer-typed fields become 256-bit numbers; everything else,
    /// including integer fields given as strings, is kept as is.
    fn widen(ty: &str, value: &ActionValue) -> SigningResult<Self> {
        let widened = if ty.starts_with("uint") {
            match value {
                ActionValue::UInt(n) => Some(Self::Uint(U256::from(*n))),
                ActionValue::Int(n) => Some(Self::Int(signed(*n)?)),
                _ => None,
            }
        } else if ty.starts_with("int") {
            match value {
                ActionValue::UInt(n) => Some(Self::Int(signed_from_unsigned(*n)?)),
                ActionValue::Int(n) => Some(Self::Int(signed(*n)?)),
                _ => None,
            }
        } else {
            None
        };
        Ok(widened.unwrap_or_else(|| Self::Raw(value.clone())))
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Self::Uint(n) => u64::try_from(*n)
                .map(JsonValue::from)
                .unwrap_or_else(|_| JsonValue::String(n.to_string())),
            Self::Int(n) => i64::try_from(*n)
                .map(JsonValue::from)
                .unwrap_or_else(|_| JsonValue::String(n.to_string())),
            Self::Bytes32(b) => JsonValue::String(b.to_string()),
            Self::Raw(v) => JsonValue::from(v),
        }
    }
}

fn signed(n: i64) -> SigningResult<I256> {
    I256::try_from(n).map_err(|e| SigningError::TypedData(format!("{n}: {e}")))
}

fn signed_from_unsigned(n: u64) -> SigningResult<I256> {
    I256::try_from(n).map_err(|e| SigningError::TypedData(format!("{n}: {e}")))
}

/// Typed structured data ready for hashing.
#[derive(Debug, Clone)]
pub struct TypedEnvelope {
    /// Struct definitions keyed by type name, including `EIP712Domain`.
    pub types: BTreeMap<String, Vec<SignField>>,
    pub primary_type: String,
    pub domain: Eip712Domain,
    /// Message fields in declared order.
    pub message: Vec<(String, FieldValue)>,
}

impl TypedEnvelope {
    fn new(
        primary_type: &str,
        table: SignTypeTable,
        domain: Eip712Domain,
        message: Vec<(String, FieldValue)>,
    ) -> Self {
        let mut types = BTreeMap::new();
        types.insert(primary_type.to_string(), table.to_vec());
        types.insert(EIP712_DOMAIN_TYPE.to_string(), EIP712_DOMAIN_FIELDS.to_vec());
        Self {
            types,
            primary_type: primary_type.to_string(),
            domain,
            message,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.message
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn message_keys(&self) -> impl Iterator<Item = &str> {
        self.message.iter().map(|(k, _)| k.as_str())
    }

    /// Render as an `eth_signTypedData_v4` JSON payload.
    pub fn to_json(&self) -> JsonValue {
        let types: serde_json::Map<String, JsonValue> = self
            .types
            .iter()
            .map(|(name, fields)| {
                let fields = fields
                    .iter()
                    .map(|f| json!({"name": f.name, "type": f.ty}))
                    .collect();
                (name.clone(), JsonValue::Array(fields))
            })
            .collect();

        let mut domain = serde_json::Map::new();
        if let Some(name) = &self.domain.name {
            domain.insert("name".into(), JsonValue::String(name.to_string()));
        }
        if let Some(version) = &self.domain.version {
            domain.insert("version".into(), JsonValue::String(version.to_string()));
        }
        if let Some(chain_id) = self.domain.chain_id {
            domain.insert(
                "chainId".into(),
                FieldValue::Uint(chain_id).to_json(),
            );
        }
        if let Some(contract) = self.domain.verifying_contract {
            domain.insert(
                "verifyingContract".into(),
                JsonValue::String(contract.to_string().to_lowercase()),
            );
        }

        let message: serde_json::Map<String, JsonValue> = self
            .message
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();

        json!({
            "types": types,
            "primaryType": self.primary_type,
            "domain": domain,
            "message": message,
        })
    }
}

/// Wrapper carrying an action hash into the exchange domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhantomAgent {
    /// "a" (mainnet) or "b" (testnet)
    pub source: &'static str,
    /// action_hash result
    pub connection_id: B256,
}

impl PhantomAgent {
    pub fn new(action_hash: B256, is_mainnet: bool) -> Self {
        Self {
            source: if is_mainnet {
                MAINNET_SOURCE
            } else {
                TESTNET_SOURCE
            },
            connection_id: action_hash,
        }
    }

    /// Exchange-action envelope: `Agent(string source,bytes32 connectionId)`.
    pub fn envelope(&self) -> TypedEnvelope {
        TypedEnvelope::new(
            AGENT_PRIMARY_TYPE,
            AGENT_SIGN_TYPES,
            exchange_domain(),
            vec![
                ("source".to_string(), FieldValue::Raw(self.source.into())),
                (
                    "connectionId".to_string(),
                    FieldValue::Bytes32(self.connection_id),
                ),
            ],
        )
    }
}

/// Build the envelope for a user-signed action.
///
/// The message holds exactly the table's fields, in table order. A declared
/// field missing from the action is skipped here; the structured hasher then
/// refuses to hash the incomplete message. Fields outside the table, such as
/// `signatureChainId` and `type`, never reach the message.
///
/// # Errors
/// Returns `SigningError::InvalidChainId` if `signatureChainId` is present
/// but not a hex string. A missing `signatureChainId` falls back to
/// [`DEFAULT_SIGNATURE_CHAIN_ID`].
pub fn user_signed_envelope(
    action: &ActionMap,
    table: SignTypeTable,
    primary_type: &str,
) -> SigningResult<TypedEnvelope> {
    let chain_id = match action.get("signatureChainId") {
        Some(ActionValue::Str(s)) => parse_chain_id(s)?,
        Some(other) => {
            return Err(SigningError::InvalidChainId {
                input: format!("{other:?}"),
            })
        }
        None => parse_chain_id(DEFAULT_SIGNATURE_CHAIN_ID)?,
    };

    let mut message = Vec::with_capacity(table.len());
    for field in table {
        if let Some(value) = action.get(field.name) {
            message.push((field.name.to_string(), FieldValue::widen(field.ty, value)?));
        }
    }

    Ok(TypedEnvelope::new(
        primary_type,
        table,
        user_signed_domain(chain_id),
        message,
    ))
}
