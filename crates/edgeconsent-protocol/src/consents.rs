//! The consents entity: preference tree, metadata timestamp, merge, XDM export.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::node::{decode_map, deep_merge, encode_map, ConsentMap, ConsentNode};
use crate::value::ConsentValue;
use edgeconsent_core::constants::data_key;
use edgeconsent_core::Result;

/// A user's consent preferences.
///
/// Metadata (`metadata.time`) lives in the same mapping as the consent
/// categories, exactly as it does on the wire:
///
/// ```json
/// {"consents": {"collect": {"val": "y"}, "metadata": {"time": "2021-03-04T05:06:07.089Z"}}}
/// ```
///
/// `Clone` is a deep copy; independent instances never share nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Consents {
    preferences: ConsentMap,
}

impl Consents {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read the `consents` object out of an XDM formatted map.
    ///
    /// A missing, non-object or empty `consents` entry yields empty consents.
    /// Leaf shapes are not validated here.
    pub fn from_xdm_map(xdm: &Map<String, Value>) -> Self {
        match xdm.get(data_key::CONSENTS) {
            Some(Value::Object(all)) if !all.is_empty() => Self::from_preferences(all),
            _ => Self::empty(),
        }
    }

    pub fn from_xdm_value(xdm: &Value) -> Self {
        match xdm {
            Value::Object(map) => Self::from_xdm_map(map),
            _ => Self::empty(),
        }
    }

    /// Build from the inner preferences object (no `consents` wrapper).
    pub fn from_preferences(preferences: &Map<String, Value>) -> Self {
        Self {
            preferences: decode_map(preferences),
        }
    }

    /// Deep copy of `other`, or empty consents when there is none.
    pub fn copy_of(other: Option<&Consents>) -> Self {
        other.cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty()
    }

    pub fn preferences(&self) -> &ConsentMap {
        &self.preferences
    }

    /// Raw node at `path`, e.g. `["marketing", "push"]`.
    pub fn get(&self, path: &[&str]) -> Option<&ConsentNode> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.preferences.get(*first)?, |node, key| node.get(key))
    }

    /// Typed consent at `path`. Unknown or malformed values are `None`.
    pub fn consent_value(&self, path: &[&str]) -> Option<ConsentValue> {
        self.get(path).and_then(ConsentNode::consent_value)
    }

    /// `metadata.time`, if present and a string.
    pub fn timestamp(&self) -> Option<&str> {
        self.preferences
            .get(data_key::METADATA)?
            .get(data_key::TIME)?
            .as_str()
    }

    /// Stamp `metadata.time` with the given epoch time in milliseconds.
    ///
    /// Does nothing on empty consents. Other metadata fields are preserved,
    /// including a `val` entry; non-object metadata is replaced.
    pub fn set_timestamp(&mut self, epoch_millis: i64) {
        if self.is_empty() {
            return;
        }

        let Some(time) = iso8601_millis(epoch_millis) else {
            debug!("Timestamp {} is out of range, consents not stamped", epoch_millis);
            return;
        };

        let mut metadata = match self.preferences.remove(data_key::METADATA) {
            Some(node) if node.is_object() => node.into_entries(),
            _ => ConsentMap::new(),
        };
        metadata.insert(
            data_key::TIME.to_string(),
            ConsentNode::Scalar(Value::String(time)),
        );
        self.preferences.insert(
            data_key::METADATA.to_string(),
            ConsentNode::normalize(metadata),
        );
    }

    /// Deep merge `fragment` into these consents.
    ///
    /// Empty fragments leave `self` untouched. Nested categories are merged key
    /// by key, so updating `marketing.email` keeps `marketing.push`.
    pub fn merge(&mut self, fragment: &Consents) {
        if fragment.is_empty() {
            return;
        }

        if self.is_empty() {
            self.preferences = fragment.preferences.clone();
            return;
        }

        deep_merge(&mut self.preferences, &fragment.preferences);
    }

    /// One-level merge: top-level categories in `fragment` replace ours wholesale.
    #[deprecated(note = "drops sibling sub-categories; use `merge`")]
    pub fn merge_shallow(&mut self, fragment: &Consents) {
        for (key, node) in &fragment.preferences {
            self.preferences.insert(key.clone(), node.clone());
        }
    }

    /// Equality with `metadata.time` ignored on both sides.
    pub fn equals_ignoring_timestamp(&self, other: &Consents) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }

        let mut lhs = self.clone();
        let mut rhs = other.clone();
        lhs.remove_timestamp();
        rhs.remove_timestamp();
        lhs == rhs
    }

    fn remove_timestamp(&mut self) {
        let Some(ConsentNode::Category(metadata)) = self.preferences.get_mut(data_key::METADATA)
        else {
            return;
        };
        if metadata.remove(data_key::TIME).is_none() {
            return;
        }

        if metadata.is_empty() {
            self.preferences.remove(data_key::METADATA);
            return;
        }
        // What is left must compare equal to the same shape decoded from JSON.
        let rest = std::mem::take(metadata);
        self.preferences.insert(
            data_key::METADATA.to_string(),
            ConsentNode::normalize(rest),
        );
    }

    /// `{"consents": {...}}`; empty consents give `{"consents": {}}`.
    pub fn as_xdm_map(&self) -> Map<String, Value> {
        let mut xdm = Map::new();
        xdm.insert(
            data_key::CONSENTS.to_string(),
            Value::Object(encode_map(&self.preferences)),
        );
        xdm
    }

    pub fn as_xdm_value(&self) -> Value {
        Value::Object(self.as_xdm_map())
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.as_xdm_value())?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::from_xdm_value(&value))
    }
}

/// Absent and empty consents compare equal; timestamps are ignored.
pub fn same_ignoring_timestamp(lhs: Option<&Consents>, rhs: Option<&Consents>) -> bool {
    match (lhs, rhs) {
        (Some(l), Some(r)) => l.equals_ignoring_timestamp(r),
        (Some(c), None) | (None, Some(c)) => c.is_empty(),
        (None, None) => true,
    }
}

/// `2021-03-04T05:06:07.089Z` style UTC timestamp.
pub fn iso8601_millis(epoch_millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(epoch_millis)
        .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl Serialize for Consents {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.as_xdm_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Consents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_xdm_value(&value))
    }
}
