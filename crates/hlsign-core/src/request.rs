//! Request and response bodies of the `/exchange` endpoint.
//!
//! This crate does no I/O; these types only fix the JSON shape that a
//! transport posts and receives.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;
use crate::signature::Signature;
use crate::value::ActionMap;
use crate::wire::address_to_wire;

/// Action types that never carry a top-level `vaultAddress`.
///
/// A sub-account is named inside the action itself for these.
const VAULTLESS_ACTION_TYPES: &[&str] = &["usdClassTransfer", "sendAsset"];

/// An unnamed agent is signed with `agentName: ""` but posted without the key.
fn strip_unnamed_agent(action: &mut ActionMap) {
    if action.get_str("type") == Some("approveAgent") && action.get_str("agentName") == Some("") {
        action.remove("agentName");
    }
}

/// Signed request body.
///
/// `vaultAddress` is always present (JSON `null` when trading for oneself);
/// `expiresAfter` is omitted when unset.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRequest {
    /// The signed action, in signing key order.
    pub action: ActionMap,
    /// Nonce used for signing.
    pub nonce: u64,
    pub signature: Signature,
    #[serde(rename = "vaultAddress")]
    pub vault_address: Option<String>,
    #[serde(rename = "expiresAfter", skip_serializing_if = "Option::is_none")]
    pub expires_after: Option<i64>,
}

impl ExchangeRequest {
    pub fn new(mut action: ActionMap, nonce: u64, signature: Signature) -> Self {
        strip_unnamed_agent(&mut action);
        Self {
            action,
            nonce,
            signature,
            vault_address: None,
            expires_after: None,
        }
    }

    /// Attach the vault the action was signed for.
    ///
    /// Ignored for action types that name their sub-account in the action.
    pub fn with_vault_address(mut self, vault_address: Option<Address>) -> Self {
        let vaultless = self
            .action
            .get_str("type")
            .is_some_and(|t| VAULTLESS_ACTION_TYPES.contains(&t));
        self.vault_address = if vaultless {
            None
        } else {
            vault_address.map(|a| address_to_wire(&a))
        };
        self
    }

    pub fn with_expires_after(mut self, expires_after: Option<i64>) -> Self {
        self.expires_after = expires_after;
        self
    }
}

/// `{"status": "ok" | "err", "response": ...}` as returned by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeResponse {
    pub status: String,
    /// Response details, or the error message when `status` is not `"ok"`.
    #[serde(default)]
    pub response: serde_json::Value,
}

impl ExchangeResponse {
    pub fn from_json(body: &str) -> Result<Self, ExchangeError> {
        serde_json::from_str(body).map_err(|e| ExchangeError::Decode(e.to_string()))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Unwrap the response details, or turn an error status into
    /// `ExchangeError::Api`.
    pub fn into_result(self) -> Result<serde_json::Value, ExchangeError> {
        if self.is_ok() {
            return Ok(self.response);
        }
        let message = match self.response {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Err(ExchangeError::Api(message))
    }
}
