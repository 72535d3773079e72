//! Attribute-addressable JSON values.
//!
//! Parsed response bodies are wrapped into [`Value`]: every JSON object becomes an
//! [`AttrMap`], every array keeps its order and wraps only the objects it holds, and
//! everything else is stored untouched as [`Value::Raw`].
//!
//! ```
//! use oanda_client_sdk::Value;
//! use serde_json::json;
//!
//! let summary = Value::wrap(json!({
//!     "account": {"balance": "100000.0000", "trades": [{"id": "6397"}]}
//! }))?;
//!
//! assert_eq!(summary["account"]["balance"].as_str(), Some("100000.0000"));
//! assert_eq!(summary.path("account.trades.0.id").and_then(|v| v.as_str()), Some("6397"));
//! # Ok::<_, oanda_client_sdk::error::Error>(())
//! ```
//!
//! Keys have to be bare identifiers and must not collide with a method name of
//! [`AttrMap`]. Bodies that break this rule fail to wrap with a
//! [`Kind::Construction`](crate::error::Kind::Construction) error; use the raw
//! representation for those.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;
use std::ops::Index;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Result;
use crate::error::{ConstructionReason, Error};

/// Names that make up the surface of [`AttrMap`] itself and therefore cannot be used as keys.
pub const RESERVED_KEYS: &[&str] = &[
    "clear",
    "contains_key",
    "deserialize_as",
    "get",
    "get_mut",
    "insert",
    "into_raw",
    "is_empty",
    "items",
    "iter",
    "keys",
    "len",
    "new",
    "path",
    "remove",
    "to_raw",
    "values",
];

static NULL: Value = Value::Raw(serde_json::Value::Null);

/// A JSON value whose objects are navigable by key name.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Scalars, and arrays nested directly inside arrays
    Raw(serde_json::Value),
    Map(AttrMap),
    /// Elements are either [`Value::Map`] or [`Value::Raw`]
    List(Vec<Value>),
}

impl Value {
    /// Wraps a parsed JSON document.
    ///
    /// Wrapping is stable: `Value::wrap(value.to_raw())` yields a value equal to `value`.
    pub fn wrap(raw: serde_json::Value) -> Result<Value> {
        match raw {
            serde_json::Value::Object(map) => Ok(Value::Map(AttrMap::new(map)?)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::wrap_element)
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            scalar => Ok(Value::Raw(scalar)),
        }
    }

    /// Array elements: only objects are wrapped.
    fn wrap_element(raw: serde_json::Value) -> Result<Value> {
        match raw {
            serde_json::Value::Object(map) => Ok(Value::Map(AttrMap::new(map)?)),
            other => Ok(Value::Raw(other)),
        }
    }

    /// Returns the untransformed JSON representation.
    #[must_use]
    pub fn to_raw(&self) -> serde_json::Value {
        match self {
            Value::Raw(raw) => raw.clone(),
            Value::Map(map) => map.to_raw(),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_raw).collect()),
        }
    }

    #[must_use]
    pub fn into_raw(self) -> serde_json::Value {
        match self {
            Value::Raw(raw) => raw,
            Value::Map(map) => map.into_raw(),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_raw).collect())
            }
        }
    }

    /// Looks up a key when this value is a map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    /// Dotted lookup, see [`AttrMap::path`]. List indexes are plain numbers.
    #[must_use]
    pub fn path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |current, segment| match current {
            Value::Map(map) => map.get(segment),
            Value::List(items) => items.get(segment.parse::<usize>().ok()?),
            Value::Raw(_) => None,
        })
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_raw(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Raw(raw) => Some(raw),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_raw()?.as_str()
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        self.as_raw()?.as_bool()
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_raw()?.as_i64()
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.as_raw()?.as_f64()
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Raw(serde_json::Value::Null))
    }

    /// Deserializes into a typed model.
    pub fn deserialize_as<T: DeserializeOwned>(&self) -> Result<T> {
        crate::serde_helpers::deserialize_with_warnings(self.to_raw())
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(raw: serde_json::Value) -> Result<Self> {
        Value::wrap(raw)
    }
}

impl From<AttrMap> for Value {
    fn from(map: AttrMap) -> Self {
        Value::Map(map)
    }
}

impl Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        self.as_list()
            .and_then(|items| items.get(index))
            .unwrap_or(&NULL)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Raw(raw) => raw.serialize(serializer),
            Value::Map(map) => map.serialize(serializer),
            Value::List(items) => items.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Value::wrap(raw).map_err(serde::de::Error::custom)
    }
}

/// A JSON object whose keys are all bare identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrMap {
    entries: BTreeMap<String, Value>,
}

impl AttrMap {
    /// Wraps a JSON object, recursively.
    pub fn new(map: serde_json::Map<String, serde_json::Value>) -> Result<AttrMap> {
        let mut wrapped = AttrMap::default();
        for (key, value) in map {
            wrapped.insert(key, value)?;
        }
        Ok(wrapped)
    }

    /// Stores `value` under `key`, wrapping it first.
    ///
    /// Fails without touching the map when `key` is not a bare identifier or is
    /// one of [`RESERVED_KEYS`].
    pub fn insert<K: Into<String>>(
        &mut self,
        key: K,
        value: serde_json::Value,
    ) -> Result<Option<Value>> {
        let key = key.into();
        validate_key(&key)?;
        let value = Value::wrap(value)?;
        Ok(self.entries.insert(key, value))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Follows a dotted path such as `"account.trades.0.id"` through nested
    /// maps and list indexes.
    #[must_use]
    pub fn path(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let value = self.get(head)?;
        match rest {
            Some(rest) => value.path(rest),
            None => Some(value),
        }
    }

    #[must_use]
    pub fn to_raw(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), value.to_raw()))
                .collect(),
        )
    }

    #[must_use]
    pub fn into_raw(self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .into_iter()
                .map(|(key, value)| (key, value.into_raw()))
                .collect(),
        )
    }

    /// Deserializes into a typed model.
    pub fn deserialize_as<T: DeserializeOwned>(&self) -> Result<T> {
        crate::serde_helpers::deserialize_with_warnings(self.to_raw())
    }
}

impl TryFrom<serde_json::Map<String, serde_json::Value>> for AttrMap {
    type Error = Error;

    fn try_from(map: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        AttrMap::new(map)
    }
}

impl Index<&str> for AttrMap {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl<'map> IntoIterator for &'map AttrMap {
    type Item = (&'map String, &'map Value);
    type IntoIter = btree_map::Iter<'map, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for AttrMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(&self.entries)
    }
}

impl<'de> Deserialize<'de> for AttrMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = serde_json::Map::deserialize(deserializer)?;
        AttrMap::new(raw).map_err(serde::de::Error::custom)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if !is_identifier(key) {
        return Err(Error::construction(key, ConstructionReason::InvalidIdentifier));
    }
    if RESERVED_KEYS.contains(&key) {
        return Err(Error::construction(key, ConstructionReason::Reserved));
    }
    Ok(())
}

/// `[A-Za-z_][A-Za-z0-9_]*`, with Unicode letters and digits accepted as well.
fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {
            chars.all(|c| c == '_' || c.is_alphanumeric())
        }
        _ => false,
    }
}
