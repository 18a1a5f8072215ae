//! Consent preference tree and the recursive merge over it.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::value::ConsentValue;
use edgeconsent_core::constants::data_key;

/// Category name → node.
pub type ConsentMap = BTreeMap<String, ConsentNode>;

/// One node of the consent preference tree.
///
/// Decoding normalizes an object that is exactly `{"val": "y"|"n"}` into
/// [`ConsentNode::Leaf`]. Every other object becomes a `Category` and every
/// non-object terminal is kept verbatim as a `Scalar`, so values this crate
/// does not understand (`{"val": "vi"}`) still round-trip unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsentNode {
    Leaf(ConsentValue),
    Category(ConsentMap),
    Scalar(Value),
}

impl ConsentNode {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(object) => Self::from_object(object),
            other => Self::Scalar(other.clone()),
        }
    }

    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self::normalize(decode_map(object))
    }

    /// Build a leaf or category from an entries map, collapsing the canonical leaf shape.
    pub fn normalize(entries: ConsentMap) -> Self {
        if entries.len() == 1 {
            if let Some(ConsentNode::Scalar(Value::String(s))) = entries.get(data_key::VALUE) {
                if let Some(value) = ConsentValue::parse(s) {
                    return Self::Leaf(value);
                }
            }
        }
        Self::Category(entries)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Leaf(value) => {
                let mut object = Map::new();
                object.insert(data_key::VALUE.to_string(), Value::String(value.as_str().into()));
                Value::Object(object)
            }
            Self::Category(entries) => Value::Object(encode_map(entries)),
            Self::Scalar(value) => value.clone(),
        }
    }

    /// Leaf and category nodes are both JSON objects on the wire.
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Leaf(_) | Self::Category(_))
    }

    /// Typed view of a leaf. Unknown values are absent.
    pub fn consent_value(&self) -> Option<ConsentValue> {
        match self {
            Self::Leaf(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Child entry of an object node.
    pub fn get(&self, key: &str) -> Option<&ConsentNode> {
        match self {
            Self::Category(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Object entries of this node; scalars have none.
    pub(crate) fn into_entries(self) -> ConsentMap {
        match self {
            Self::Leaf(value) => BTreeMap::from([(
                data_key::VALUE.to_string(),
                Self::Scalar(Value::String(value.as_str().into())),
            )]),
            Self::Category(entries) => entries,
            Self::Scalar(_) => ConsentMap::new(),
        }
    }
}

/// Recursively merge `incoming` into `target`.
///
/// Keys only in `target` are kept. Where both sides hold objects the entries
/// are merged key by key; anywhere else the incoming node replaces the
/// existing one.
pub fn deep_merge(target: &mut ConsentMap, incoming: &ConsentMap) {
    for (key, node) in incoming {
        let merged = match target.remove(key) {
            Some(existing) => merge_node(existing, node),
            None => node.clone(),
        };
        target.insert(key.clone(), merged);
    }
}

fn merge_node(existing: ConsentNode, incoming: &ConsentNode) -> ConsentNode {
    match (existing, incoming) {
        (ConsentNode::Category(mut entries), ConsentNode::Category(update)) => {
            deep_merge(&mut entries, update);
            ConsentNode::normalize(entries)
        }
        (existing, incoming) if existing.is_object() && incoming.is_object() => {
            let mut entries = existing.into_entries();
            deep_merge(&mut entries, &incoming.clone().into_entries());
            ConsentNode::normalize(entries)
        }
        (_, incoming) => incoming.clone(),
    }
}

pub(crate) fn decode_map(object: &Map<String, Value>) -> ConsentMap {
    object
        .iter()
        .map(|(key, value)| (key.clone(), ConsentNode::from_value(value)))
        .collect()
}

pub(crate) fn encode_map(entries: &ConsentMap) -> Map<String, Value> {
    entries
        .iter()
        .map(|(key, node)| (key.clone(), node.to_value()))
        .collect()
}

impl Serialize for ConsentNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ConsentNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map_of(value: Value) -> ConsentMap {
        match value {
            Value::Object(object) => decode_map(&object),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_decode_normalizes_leaves() {
        let node = ConsentNode::from_value(&json!({"val": "y"}));
        assert_eq!(node, ConsentNode::Leaf(ConsentValue::Yes));

        let unknown = ConsentNode::from_value(&json!({"val": "vi"}));
        assert!(matches!(unknown, ConsentNode::Category(_)));
        assert_eq!(unknown.consent_value(), None);
        assert_eq!(unknown.to_value(), json!({"val": "vi"}));

        let extra = ConsentNode::from_value(&json!({"val": "y", "idType": "ECID"}));
        assert!(matches!(extra, ConsentNode::Category(_)));
    }

    #[test]
    fn test_scalars_round_trip() {
        for value in [json!("none"), json!(3), json!(true), json!(null), json!([1, "a"])] {
            assert_eq!(ConsentNode::from_value(&value).to_value(), value);
        }
    }

    #[test]
    fn test_merge_keeps_siblings() {
        let mut target = map_of(json!({"marketing": {"preferred": "none", "push": {"val": "y"}}}));
        let incoming = map_of(json!({"marketing": {"email": {"val": "y"}}}));
        deep_merge(&mut target, &incoming);

        assert_eq!(
            Value::Object(encode_map(&target)),
            json!({"marketing": {"preferred": "none", "push": {"val": "y"}, "email": {"val": "y"}}})
        );
    }

    #[test]
    fn test_merge_leaf_overwrites_leaf() {
        let mut target = map_of(json!({"collect": {"val": "y"}}));
        deep_merge(&mut target, &map_of(json!({"collect": {"val": "n"}})));
        assert_eq!(target["collect"], ConsentNode::Leaf(ConsentValue::No));
    }

    #[test]
    fn test_merge_leaf_into_richer_object_keeps_extra_keys() {
        let mut target = map_of(json!({"adID": {"val": "y", "idType": "GAID"}}));
        deep_merge(&mut target, &map_of(json!({"adID": {"val": "n"}})));
        assert_eq!(
            target["adID"].to_value(),
            json!({"val": "n", "idType": "GAID"})
        );
    }

    #[test]
    fn test_merge_type_collision_incoming_wins() {
        let mut target = map_of(json!({"marketing": {"push": {"val": "y"}}}));
        deep_merge(&mut target, &map_of(json!({"marketing": "none"})));
        assert_eq!(target["marketing"], ConsentNode::Scalar(json!("none")));

        deep_merge(&mut target, &map_of(json!({"marketing": {"sms": {"val": "n"}}})));
        assert_eq!(target["marketing"].to_value(), json!({"sms": {"val": "n"}}));
    }

    #[test]
    fn test_merge_unknown_value_becomes_leaf() {
        let mut target = map_of(json!({"personalize": {"content": {"val": "vi"}}}));
        deep_merge(&mut target, &map_of(json!({"personalize": {"content": {"val": "y"}}})));
        assert_eq!(
            target["personalize"].get("content"),
            Some(&ConsentNode::Leaf(ConsentValue::Yes))
        );
    }
}
