//! Events exchanged with the host event hub.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use edgeconsent_core::constants::{data_key, event_name, event_source, event_type};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    /// Id of the request this event answers.
    #[serde(
        rename = "responseId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response_id: Option<Uuid>,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        event_type: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            event_type: event_type.into(),
            source: source.into(),
            data: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
            response_id: None,
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_timestamp(mut self, epoch_millis: i64) -> Self {
        self.timestamp = epoch_millis;
        self
    }

    pub fn is(&self, event_type: &str, source: &str) -> bool {
        self.event_type == event_type && self.source == source
    }

    /// Request to merge an XDM formatted consents map.
    pub fn consent_update_request(xdm: Map<String, Value>) -> Self {
        Self::new(
            event_name::CONSENT_UPDATE_REQUEST,
            event_type::CONSENT,
            event_source::UPDATE_CONSENT,
        )
        .with_data(xdm)
    }

    pub fn get_consents_request() -> Self {
        Self::new(
            event_name::GET_CONSENTS_REQUEST,
            event_type::CONSENT,
            event_source::REQUEST_CONTENT,
        )
    }

    /// `consent:preferences` handle from the edge network.
    pub fn edge_consent_preference(payload: Vec<Value>) -> Self {
        let mut data = Map::new();
        data.insert(data_key::PAYLOAD.to_string(), Value::Array(payload));
        data.insert(
            data_key::TYPE.to_string(),
            Value::String(event_source::CONSENT_PREFERENCE.to_string()),
        );
        Self::new(
            event_name::EDGE_CONSENT_PREFERENCE,
            event_type::EDGE,
            event_source::CONSENT_PREFERENCE,
        )
        .with_data(data)
    }

    /// Hub notification that `owner` published a new shared state.
    pub fn shared_state_change(owner: &str) -> Self {
        let mut data = Map::new();
        data.insert(
            data_key::STATE_OWNER.to_string(),
            Value::String(owner.to_string()),
        );
        Self::new(
            event_name::SHARED_STATE_CHANGE,
            event_type::HUB,
            event_source::SHARED_STATE,
        )
        .with_data(data)
    }
}
