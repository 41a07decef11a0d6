//! Signing error types.

use thiserror::Error;

/// Errors raised while encoding, hashing or signing an action.
///
/// Every variant carries the offending value so callers can diagnose the
/// failure without re-running the pipeline. Nothing here is retried internally.
#[derive(Debug, Error)]
pub enum SigningError {
    // --- encoding ---
    #[error("Action encoding failed: {0}")]
    Encoding(String),

    #[error("Action value conversion failed: {0}")]
    Json(String),

    // --- precision ---
    #[error("Float {value} cannot be sent on the wire without rounding")]
    FloatToWire { value: f64 },

    #[error("Float {value} cannot be scaled by 10^{decimals} without rounding")]
    FloatToInt { value: f64, decimals: u32 },

    #[error("Decimal {value} has more than 8 decimal places")]
    DecimalToWire { value: String },

    // --- malformed input ---
    #[error("Invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("Invalid order type: must have either limit or trigger")]
    InvalidOrderType,

    #[error("Invalid cloid {input:?}: {reason}")]
    InvalidCloid { input: String, reason: String },

    #[error("Invalid signature chain id: {input:?}")]
    InvalidChainId { input: String },

    #[error("Unknown asset: {coin}")]
    UnknownAsset { coin: String },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    // --- structured data ---
    #[error("Typed data error: {0}")]
    TypedData(String),

    // --- cryptographic ---
    #[error("Signing failed: {0}")]
    Signing(#[from] alloy::signers::Error),
}

impl From<rmp_serde::encode::Error> for SigningError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Self::Encoding(e.to_string())
    }
}

impl From<serde_json::Error> for SigningError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

pub type SigningResult<T> = Result<T, SigningError>;

/// Errors reported by the exchange in its `{status, response}` envelope.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Exchange rejected request: {0}")]
    Api(String),

    #[error("Failed to decode exchange response: {0}")]
    Decode(String),
}
