//! Ordered action values.
//!
//! An action is an open-ended key/value tree whose key order is part of the
//! signed bytes. It is modelled as a tagged value over an explicit ordered
//! list of entries, never a hash map, so encoding order is a property of the
//! data itself.
//!
//! Integers are normalised on entry: every non-negative integer becomes
//! [`ActionValue::UInt`] and only negative integers are [`ActionValue::Int`].
//! The canonical encoder relies on this to emit unsigned tags for positive
//! numbers. Floats are always finite.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::error::{SigningError, SigningResult};

/// A single value inside an action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionValue {
    /// `null` in JSON, `nil` in msgpack.
    Nil,
    Bool(bool),
    UInt(u64),
    /// Negative integers only.
    Int(i64),
    Float(FiniteFloat),
    Str(String),
    Map(ActionMap),
    Seq(Vec<ActionValue>),
}

/// An `f64` that is neither NaN nor infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiniteFloat(f64);

impl FiniteFloat {
    pub fn new(value: f64) -> Option<Self> {
        value.is_finite().then_some(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl ActionValue {
    /// Convert any serde record into an action value.
    ///
    /// Goes through `serde_json` with `preserve_order`, so declared field
    /// order and `#[serde(rename)]` tags are kept. A `None` that is not
    /// skipped becomes [`ActionValue::Nil`].
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> SigningResult<Self> {
        let json = serde_json::to_value(value)?;
        Self::try_from(json)
    }

    /// Build a signed integer, normalising non-negative values to `UInt`.
    pub fn int(value: i64) -> Self {
        if value >= 0 {
            Self::UInt(value as u64)
        } else {
            Self::Int(value)
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ActionMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short type label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::UInt(_) => "uint",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Map(_) => "map",
            Self::Seq(_) => "seq",
        }
    }
}

impl From<bool> for ActionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u64> for ActionValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<u32> for ActionValue {
    fn from(v: u32) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<usize> for ActionValue {
    fn from(v: usize) -> Self {
        Self::UInt(v as u64)
    }
}

impl From<i64> for ActionValue {
    fn from(v: i64) -> Self {
        Self::int(v)
    }
}

impl From<i32> for ActionValue {
    fn from(v: i32) -> Self {
        Self::int(i64::from(v))
    }
}

impl TryFrom<f64> for ActionValue {
    type Error = SigningError;

    fn try_from(v: f64) -> SigningResult<Self> {
        FiniteFloat::new(v)
            .map(Self::Float)
            .ok_or_else(|| SigningError::Json(format!("non-finite float {v}")))
    }
}

impl From<&str> for ActionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ActionValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<ActionMap> for ActionValue {
    fn from(v: ActionMap) -> Self {
        Self::Map(v)
    }
}

impl<T: Into<ActionValue>> From<Option<T>> for ActionValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Nil, Into::into)
    }
}

impl<T: Into<ActionValue>> From<Vec<T>> for ActionValue {
    fn from(v: Vec<T>) -> Self {
        Self::Seq(v.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<JsonValue> for ActionValue {
    type Error = SigningError;

    fn try_from(value: JsonValue) -> SigningResult<Self> {
        match value {
            JsonValue::Null => Ok(Self::Nil),
            JsonValue::Bool(b) => Ok(Self::Bool(b)),
            JsonValue::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Ok(Self::UInt(u))
                } else if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else {
                    n.as_f64()
                        .and_then(FiniteFloat::new)
                        .map(Self::Float)
                        .ok_or_else(|| SigningError::Json(format!("unrepresentable number {n}")))
                }
            }
            JsonValue::String(s) => Ok(Self::Str(s)),
            JsonValue::Array(items) => items
                .into_iter()
                .map(Self::try_from)
                .collect::<SigningResult<Vec<_>>>()
                .map(Self::Seq),
            JsonValue::Object(obj) => {
                let mut map = ActionMap::new();
                for (k, v) in obj {
                    map.insert(k, Self::try_from(v)?);
                }
                Ok(Self::Map(map))
            }
        }
    }
}

impl From<&ActionValue> for JsonValue {
    fn from(value: &ActionValue) -> Self {
        match value {
            ActionValue::Nil => JsonValue::Null,
            ActionValue::Bool(b) => JsonValue::Bool(*b),
            ActionValue::UInt(n) => JsonValue::from(*n),
            ActionValue::Int(n) => JsonValue::from(*n),
            ActionValue::Float(f) => JsonValue::from(f.get()),
            ActionValue::Str(s) => JsonValue::String(s.clone()),
            ActionValue::Map(m) => JsonValue::from(m),
            ActionValue::Seq(items) => JsonValue::Array(items.iter().map(JsonValue::from).collect()),
        }
    }
}

impl Serialize for ActionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Nil => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::UInt(n) => serializer.serialize_u64(*n),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(f.get()),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Map(m) => m.serialize(serializer),
            Self::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Insertion-ordered string-keyed map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionMap {
    entries: Vec<(String, ActionValue)>,
}

impl ActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an action with its `type` tag as the first key.
    pub fn with_type(action_type: &str) -> Self {
        let mut map = Self::new();
        map.insert("type", action_type);
        map
    }

    /// Insert a value.
    ///
    /// An existing key keeps its position and has its value replaced; a new
    /// key is appended. Returns the previous value, if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ActionValue>,
    ) -> Option<ActionValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Chaining form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ActionValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ActionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ActionValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<ActionValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Copy of this map without `key`.
    pub fn without(&self, key: &str) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| k != key)
                .cloned()
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<ActionValue>> FromIterator<(K, V)> for ActionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl IntoIterator for ActionMap {
    type Item = (String, ActionValue);
    type IntoIter = std::vec::IntoIter<(String, ActionValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl TryFrom<JsonValue> for ActionMap {
    type Error = SigningError;

    fn try_from(value: JsonValue) -> SigningResult<Self> {
        match ActionValue::try_from(value)? {
            ActionValue::Map(m) => Ok(m),
            other => Err(SigningError::Json(format!(
                "action must be an object, got {}",
                other.kind()
            ))),
        }
    }
}

impl From<&ActionMap> for JsonValue {
    fn from(map: &ActionMap) -> Self {
        JsonValue::Object(
            map.iter()
                .map(|(k, v)| (k.to_string(), JsonValue::from(v)))
                .collect(),
        )
    }
}

impl Serialize for ActionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
