//! Request signing for the Hyperliquid exchange API.
//!
//! Turns an action into the `{r, s, v}` signature the exchange verifies.
//! The crate is synchronous and does no network I/O.
//!
//! # Key Components
//!
//! - [`ActionMap`]: Ordered action model shared by hashing and the request body
//! - [`action_hash`]: keccak256 over msgpack(action) ++ nonce ++ vault ++ expiry
//! - [`PhantomAgent`]: EIP-712 `Agent` wrapper signed for exchange (L1) actions
//! - [`UserSignedKind`]: Registry of user-signed action types and their tables
//! - [`signing_hash`]: EIP-712 digest of a [`TypedEnvelope`]
//! - [`Signer`]: Loaded key plus network flag
//! - [`NonceManager`]: Strictly increasing millisecond nonces
//!
//! # Signing Flows
//!
//! 1. Exchange action -> [`sign_exchange_action`] (hash, phantom agent, sign)
//! 2. User-signed action -> [`sign_user_action`] (stamp chain, sign fields)
//! 3. Multi-sig envelope -> [`sign_multi_sig_action`] (hash inner, sign `SendMultiSig`)

pub mod actions;
pub mod encoding;
pub mod envelope;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod nonce;
pub mod order;
pub mod request;
pub mod sign_types;
pub mod signature;
pub mod signer;
pub mod typed_hash;
pub mod value;
pub mod wire;

// Error types
pub use error::{ExchangeError, SigningError, SigningResult};

// Action model and hashing
pub use encoding::encode_action;
pub use hashing::{action_hash, HashInput};
pub use value::{ActionMap, ActionValue, FiniteFloat};

// Typed data
pub use envelope::{
    exchange_domain, user_signed_domain, user_signed_envelope, FieldValue, PhantomAgent,
    TypedEnvelope,
};
pub use sign_types::{SignField, SignTypeTable, UserSignedKind};
pub use typed_hash::{domain_separator, message_hash, signing_hash};

// Signing
pub use keys::{KeyError, KeyManager, KeySource};
pub use signature::Signature;
pub use signer::{
    sign_exchange_action, sign_multi_sig_action, sign_user_action, sign_user_kind, Signer,
};

// Wire records
pub use order::{
    AssetLookup, BuilderInfo, CancelByCloidWire, CancelWire, Cloid, Grouping, ModifyRequest,
    ModifyWire, OrderId, OrderRequest, OrderType, OrderTypeWire, OrderWire, Tif, Tpsl,
};
pub use wire::{decimal_to_wire, float_to_int, float_to_wire};

// Transport boundary
pub use nonce::{Clock, NonceManager, SystemClock};
pub use request::{ExchangeRequest, ExchangeResponse};
