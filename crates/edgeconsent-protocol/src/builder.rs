//! Builder for XDM formatted consent maps.
//!
//! Values are taken as strings so that unknown values (`"vi"`) can be
//! produced as easily as `"y"` and `"n"`.

use serde_json::{Map, Value};

use crate::consents::Consents;
use edgeconsent_core::constants::data_key;

pub const COLLECT: &str = "collect";
pub const AD_ID: &str = "adID";
pub const PERSONALIZE: &str = "personalize";
pub const CONTENT: &str = "content";
pub const MARKETING: &str = "marketing";
pub const PREFERRED: &str = "preferred";

#[derive(Debug, Clone, Default)]
pub struct ConsentsBuilder {
    preferences: Map<String, Value>,
}

impl ConsentsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(self, value: impl AsRef<str>) -> Self {
        self.leaf(&[COLLECT], value)
    }

    pub fn ad_id(self, value: impl AsRef<str>) -> Self {
        self.leaf(&[AD_ID], value)
    }

    pub fn personalize_content(self, value: impl AsRef<str>) -> Self {
        self.leaf(&[PERSONALIZE, CONTENT], value)
    }

    pub fn marketing_preferred(self, channel: impl Into<String>) -> Self {
        self.entry(&[MARKETING, PREFERRED], Value::String(channel.into()))
    }

    pub fn marketing_channel(self, channel: &str, value: impl AsRef<str>) -> Self {
        self.leaf(&[MARKETING, channel], value)
    }

    pub fn metadata_time(self, time: impl Into<String>) -> Self {
        self.entry(&[data_key::METADATA, data_key::TIME], Value::String(time.into()))
    }

    /// `{"val": value}` at `path`.
    pub fn leaf(self, path: &[&str], value: impl AsRef<str>) -> Self {
        let mut leaf = Map::new();
        leaf.insert(
            data_key::VALUE.to_string(),
            Value::String(value.as_ref().to_string()),
        );
        self.entry(path, Value::Object(leaf))
    }

    /// Arbitrary value at `path`; intermediate objects are created (or replace non-objects).
    pub fn entry(mut self, path: &[&str], value: Value) -> Self {
        insert_path(&mut self.preferences, path, value);
        self
    }

    /// Preferences without the `consents` wrapper, as found in edge payloads.
    pub fn build_preferences(self) -> Map<String, Value> {
        self.preferences
    }

    pub fn build_xdm_map(self) -> Map<String, Value> {
        let mut xdm = Map::new();
        xdm.insert(
            data_key::CONSENTS.to_string(),
            Value::Object(self.preferences),
        );
        xdm
    }

    pub fn build_value(self) -> Value {
        Value::Object(self.build_xdm_map())
    }

    pub fn build(self) -> Consents {
        Consents::from_xdm_map(&self.build_xdm_map())
    }
}

fn insert_path(object: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [last] => {
            object.insert(last.to_string(), value);
        }
        [first, rest @ ..] => {
            let slot = object
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                insert_path(inner, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builds_canonical_shape() {
        let value = ConsentsBuilder::new()
            .collect("y")
            .ad_id("n")
            .personalize_content("vi")
            .marketing_preferred("email")
            .marketing_channel("push", "y")
            .metadata_time("2019-09-23T18:15:45Z")
            .build_value();

        assert_eq!(
            value,
            json!({"consents": {
                "collect": {"val": "y"},
                "adID": {"val": "n"},
                "personalize": {"content": {"val": "vi"}},
                "marketing": {"preferred": "email", "push": {"val": "y"}},
                "metadata": {"time": "2019-09-23T18:15:45Z"}
            }})
        );
    }

    #[test]
    fn test_entry_replaces_non_object_parent() {
        let prefs = ConsentsBuilder::new()
            .entry(&["marketing"], json!("none"))
            .marketing_channel("sms", "n")
            .build_preferences();
        assert_eq!(Value::Object(prefs), json!({"marketing": {"sms": {"val": "n"}}}));
    }

    #[test]
    fn test_empty_builder_builds_empty_consents() {
        assert!(ConsentsBuilder::new().build().is_empty());
        assert_eq!(ConsentsBuilder::new().build_value(), json!({"consents": {}}));
    }
}
