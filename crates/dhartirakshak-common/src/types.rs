use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::fmt;

/// A JSON object as returned by the API.
///
/// The API is loosely typed and varies field names between endpoints, so
/// records stay untyped and are read through [`crate::normalize`].
pub type Record = serde_json::Map<String, Value>;

/// Opaque record identifier.
///
/// The API sends ids as JSON numbers on some endpoints and strings on others.
/// Both normalize to the same textual form, so `7` and `"7"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(SmolStr);

impl ItemId {
    /// Create an id from its textual form.
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    /// Read an id out of a JSON value. Strings that are empty after trimming,
    /// nulls, booleans and containers are not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self(SmolStr::new(s.trim()))),
            Value::Number(n) => Some(Self(SmolStr::new(n.to_string()))),
            _ => None,
        }
    }

    /// The textual form, as it appears in request paths.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(SmolStr::new(id.to_string()))
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        ItemId::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a non-empty string or number id"))
    }
}
