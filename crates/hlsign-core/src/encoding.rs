//! Canonical MessagePack encoding of actions.
//!
//! Uses `rmp_serde` named encoding: maps are written in insertion order,
//! non-negative integers take the most compact unsigned tag, negative ones the
//! compact signed tag, floats are always float64.

use serde::Serialize;
use tracing::trace;

use crate::error::SigningResult;
use crate::value::ActionMap;

/// Encode an action into its canonical bytes.
pub fn encode_action(action: &ActionMap) -> SigningResult<Vec<u8>> {
    let bytes = encode(action)?;
    trace!(bytes = %hex::encode(&bytes), "Canonical action encoding");
    Ok(bytes)
}

/// Encode any serde value with the same rules as [`encode_action`].
///
/// Struct fields are written as map entries keyed by their serde names.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> SigningResult<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(value)?)
}
