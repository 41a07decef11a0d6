//! Order requests and their wire records.
//!
//! Wire records serialize with the exchange's short keys (`a`, `b`, `p`, ...).
//! Every key is declared with `#[serde(rename)]`; field declaration order is
//! the encoded key order.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{SigningError, SigningResult};
use crate::wire::{float_to_wire, normalize_address};

/// Spot assets are numbered from this offset.
pub const SPOT_ASSET_OFFSET: u32 = 10_000;

// =============================================================================
// Cloid
// =============================================================================

/// Client order id: 16 bytes, rendered `0x` + 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cloid(u128);

impl Cloid {
    pub fn from_int(value: u128) -> Self {
        Self(value)
    }

    /// Random id from UUID v4 bytes.
    pub fn random() -> Self {
        Self(Uuid::new_v4().as_u128())
    }

    pub fn to_raw(&self) -> String {
        format!("0x{:032x}", self.0)
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl FromStr for Cloid {
    type Err = SigningError;

    fn from_str(s: &str) -> SigningResult<Self> {
        let invalid = |reason: String| SigningError::InvalidCloid {
            input: s.to_string(),
            reason,
        };
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| invalid("cloid must start with 0x".to_string()))?;
        if digits.len() != 32 {
            return Err(invalid(format!(
                "cloid must be 16 bytes (32 hex chars), got {}",
                digits.len()
            )));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid("invalid hex string".to_string()));
        }
        u128::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| invalid(e.to_string()))
    }
}

impl fmt::Display for Cloid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:032x}", self.0)
    }
}

impl Serialize for Cloid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_raw())
    }
}

impl<'de> Deserialize<'de> for Cloid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Order type
// =============================================================================

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tif {
    /// Add-liquidity-only.
    Alo,
    /// Immediate-or-cancel.
    Ioc,
    /// Good-til-cancelled.
    Gtc,
}

/// Take-profit or stop-loss trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tpsl {
    Tp,
    Sl,
}

/// Order grouping of an `order` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Grouping {
    /// Not applicable (independent orders).
    #[default]
    Na,
    NormalTpsl,
    PositionTpsl,
}

impl Grouping {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Na => "na",
            Self::NormalTpsl => "normalTpsl",
            Self::PositionTpsl => "positionTpsl",
        }
    }
}

/// Limit order type: `{"tif": "Gtc"|"Ioc"|"Alo"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderType {
    pub tif: Tif,
}

/// Trigger order parameters as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOrderType {
    pub trigger_px: f64,
    pub is_market: bool,
    pub tpsl: Tpsl,
}

/// Order type as supplied by the caller. Exactly one variant should be set;
/// `limit` wins if both are.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<LimitOrderType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerOrderType>,
}

impl OrderType {
    pub fn limit(tif: Tif) -> Self {
        Self {
            limit: Some(LimitOrderType { tif }),
            trigger: None,
        }
    }

    pub fn trigger(trigger_px: f64, is_market: bool, tpsl: Tpsl) -> Self {
        Self {
            limit: None,
            trigger: Some(TriggerOrderType {
                trigger_px,
                is_market,
                tpsl,
            }),
        }
    }

    /// Convert to the wire shape.
    ///
    /// # Errors
    /// `InvalidOrderType` if neither variant is set, `FloatToWire` if the
    /// trigger price has too many decimals.
    pub fn to_wire(&self) -> SigningResult<OrderTypeWire> {
        if let Some(limit) = self.limit {
            return Ok(OrderTypeWire::Limit { limit });
        }
        let trigger = self.trigger.ok_or(SigningError::InvalidOrderType)?;
        Ok(OrderTypeWire::Trigger {
            trigger: TriggerOrderTypeWire {
                is_market: trigger.is_market,
                trigger_px: float_to_wire(trigger.trigger_px)?,
                tpsl: trigger.tpsl,
            },
        })
    }
}

/// Order type wire format.
///
/// - Limit: `{"limit": {"tif": "Gtc"}}`
/// - Trigger: `{"trigger": {"isMarket": true, "triggerPx": "...", "tpsl": "tp"}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderTypeWire {
    Limit { limit: LimitOrderType },
    Trigger { trigger: TriggerOrderTypeWire },
}

/// Trigger wire format.
///
/// Field order must match the exchange for correct msgpack serialization:
/// isMarket -> triggerPx -> tpsl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerOrderTypeWire {
    #[serde(rename = "isMarket")]
    pub is_market: bool,

    #[serde(rename = "triggerPx")]
    pub trigger_px: String,

    pub tpsl: Tpsl,
}

// =============================================================================
// Requests and wire records
// =============================================================================

/// An order as the caller thinks of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub coin: String,
    pub is_buy: bool,
    pub sz: f64,
    pub limit_px: f64,
    pub order_type: OrderType,
    #[serde(default)]
    pub reduce_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloid: Option<Cloid>,
}

/// Order wire format: `{a, b, p, s, r, t, [c]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWire {
    /// Asset index
    #[serde(rename = "a")]
    pub asset: u32,

    /// Buy (true) or Sell (false)
    #[serde(rename = "b")]
    pub is_buy: bool,

    /// Limit price as string
    #[serde(rename = "p")]
    pub limit_px: String,

    /// Size as string
    #[serde(rename = "s")]
    pub sz: String,

    #[serde(rename = "r")]
    pub reduce_only: bool,

    #[serde(rename = "t")]
    pub order_type: OrderTypeWire,

    /// Client order ID (key omitted when absent)
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub cloid: Option<Cloid>,
}

/// Convert an order to its wire record with an explicit asset id.
pub fn order_request_to_wire_with_asset(
    order: &OrderRequest,
    asset: u32,
) -> SigningResult<OrderWire> {
    Ok(OrderWire {
        asset,
        is_buy: order.is_buy,
        limit_px: float_to_wire(order.limit_px)?,
        sz: float_to_wire(order.sz)?,
        reduce_only: order.reduce_only,
        order_type: order.order_type.to_wire()?,
        cloid: order.cloid,
    })
}

/// Convert an order to its wire record, resolving the coin through `assets`.
///
/// # Errors
/// `UnknownAsset` if the coin is not in the lookup.
pub fn order_request_to_wire(order: &OrderRequest, assets: &AssetLookup) -> SigningResult<OrderWire> {
    order_request_to_wire_with_asset(order, assets.asset(&order.coin)?)
}

/// Either an exchange order id or a client order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderId {
    Oid(u64),
    Cloid(Cloid),
}

impl From<u64> for OrderId {
    fn from(oid: u64) -> Self {
        Self::Oid(oid)
    }
}

impl From<Cloid> for OrderId {
    fn from(cloid: Cloid) -> Self {
        Self::Cloid(cloid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyRequest {
    pub oid: OrderId,
    pub order: OrderRequest,
}

/// Modify wire format: `{oid, order}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifyWire {
    pub oid: OrderId,
    pub order: OrderWire,
}

/// Cancel wire format: `{"a": 5, "o": 123456789}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelWire {
    /// Asset index
    #[serde(rename = "a")]
    pub asset: u32,

    /// Exchange order ID
    #[serde(rename = "o")]
    pub oid: u64,
}

/// Cancel-by-cloid wire format: `{"asset": 5, "cloid": "0x..."}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelByCloidWire {
    pub asset: u32,
    pub cloid: Cloid,
}

/// Builder fee attribution: `{"b": address, "f": fee}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderInfo {
    /// Builder address, lowercase
    #[serde(rename = "b")]
    pub address: String,
    /// Fee in tenths of a basis point
    #[serde(rename = "f")]
    pub fee: u64,
}

impl BuilderInfo {
    pub fn new(address: &str, fee: u64) -> SigningResult<Self> {
        Ok(Self {
            address: normalize_address(address)?,
            fee,
        })
    }
}

// =============================================================================
// Asset lookup
// =============================================================================

/// Perp universe entry from the exchange `meta` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PerpAssetInfo {
    pub name: String,
}

/// Spot universe entry from the exchange `spotMeta` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotAssetInfo {
    pub name: String,
    pub index: u32,
}

/// Immutable coin -> asset id map.
///
/// Built once and passed by reference into wire conversion.
#[derive(Debug, Clone, Default)]
pub struct AssetLookup {
    by_coin: HashMap<String, u32>,
}

impl AssetLookup {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            by_coin: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Perps are numbered by universe position, spots by `10000 + index`.
    ///
    /// # Errors
    /// `UnknownAsset` naming the coin whose id does not fit in a `u32`.
    pub fn from_universe(
        perps: &[PerpAssetInfo],
        spots: &[SpotAssetInfo],
    ) -> SigningResult<Self> {
        let out_of_range = |coin: &str| SigningError::UnknownAsset {
            coin: coin.to_string(),
        };
        let mut by_coin = HashMap::with_capacity(perps.len() + spots.len());
        for (i, perp) in perps.iter().enumerate() {
            let id = u32::try_from(i).map_err(|_| out_of_range(&perp.name))?;
            by_coin.insert(perp.name.clone(), id);
        }
        for spot in spots {
            let id = SPOT_ASSET_OFFSET
                .checked_add(spot.index)
                .ok_or_else(|| out_of_range(&spot.name))?;
            by_coin.insert(spot.name.clone(), id);
        }
        Ok(Self { by_coin })
    }

    pub fn asset(&self, coin: &str) -> SigningResult<u32> {
        self.by_coin
            .get(coin)
            .copied()
            .ok_or_else(|| SigningError::UnknownAsset {
                coin: coin.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.by_coin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_coin.is_empty()
    }
}
