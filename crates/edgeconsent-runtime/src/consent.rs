//! Public consent API used by applications.

use serde_json::{Map, Value};
use tracing::debug;

use crate::event::Event;
use crate::hub::EventHub;
use edgeconsent_core::constants::EXTENSION_VERSION;
use edgeconsent_core::{Error, Result};

pub struct Consent;

impl Consent {
    pub fn extension_version() -> &'static str {
        EXTENSION_VERSION
    }

    /// Merge an XDM formatted consents map (`{"consents": {...}}`) into the
    /// current consents.
    pub fn update(hub: &EventHub, xdm: Map<String, Value>) -> Result<()> {
        debug!("Consent update requested");
        hub.dispatch(Event::consent_update_request(xdm))
    }

    /// Current consents in XDM format; `{"consents": {}}` when none are set.
    pub async fn get_consents(hub: &EventHub) -> Result<Map<String, Value>> {
        let response = hub
            .dispatch_with_response(Event::get_consents_request(), hub.response_timeout())
            .await?;
        response
            .data
            .ok_or_else(|| Error::Internal("get consents response without data".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgeconsent_core::constants::datastore;
    use edgeconsent_core::ConsentConfig;
    use edgeconsent_protocol::ConsentsBuilder;
    use edgeconsent_store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_extension_version_is_crate_version() {
        assert_eq!(Consent::extension_version(), env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_update_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConsentConfig::new(dir.path()).unwrap();
        let hub = EventHub::start(Arc::new(MemoryStore::new(datastore::NAME)), &config);

        assert_eq!(
            Value::Object(Consent::get_consents(&hub).await.unwrap()),
            json!({"consents": {}})
        );

        Consent::update(&hub, ConsentsBuilder::new().collect("y").build_xdm_map()).unwrap();
        let consents = Consent::get_consents(&hub).await.unwrap();
        assert_eq!(consents["consents"]["collect"], json!({"val": "y"}));
        assert!(consents["consents"]["metadata"]["time"].is_string());
    }
}
