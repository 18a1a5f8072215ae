//! Consent extension — routes hub events to the consent manager and
//! publishes the merged consents.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::event::Event;
use crate::host::ExtensionApi;
use edgeconsent_core::constants::{
    configuration, data_key, event_name, event_source, event_type, EXTENSION_NAME,
    EXTENSION_VERSION,
};
use edgeconsent_protocol::consents::same_ignoring_timestamp;
use edgeconsent_protocol::{ConsentManager, Consents};

pub struct ConsentExtension {
    api: Arc<dyn ExtensionApi>,
    manager: ConsentManager,
}

impl ConsentExtension {
    pub fn new(api: Arc<dyn ExtensionApi>, manager: ConsentManager) -> Self {
        Self { api, manager }
    }

    pub fn name(&self) -> &'static str {
        EXTENSION_NAME
    }

    pub fn version(&self) -> &'static str {
        EXTENSION_VERSION
    }

    pub fn manager(&self) -> &ConsentManager {
        &self.manager
    }

    /// Pick up configuration defaults already published and share any
    /// consents loaded from persistence.
    pub fn on_registered(&mut self) {
        if let Some(defaults) = self.configured_default_consents() {
            self.manager.update_default_consents(defaults);
        }

        if let Some(current) = self.manager.current_consents() {
            if let Err(e) = self.api.set_shared_state(current.as_xdm_map(), None) {
                debug!("Failed to share initial consents: {}", e);
            }
        }
        info!("{} {} registered", EXTENSION_NAME, EXTENSION_VERSION);
    }

    /// Route one event to its handler. Unrelated events are ignored.
    pub fn handle_event(&mut self, event: &Event) {
        if event.is(event_type::CONSENT, event_source::UPDATE_CONSENT) {
            self.handle_consent_update(event);
        } else if event.is(event_type::EDGE, event_source::CONSENT_PREFERENCE) {
            self.handle_edge_consent_preference(event);
        } else if event.is(event_type::CONSENT, event_source::REQUEST_CONTENT) {
            self.handle_request_content(event);
        } else if event.is(event_type::HUB, event_source::SHARED_STATE) {
            self.handle_shared_state_change(event);
        } else {
            debug!(
                "Ignoring event {} ({} / {})",
                event.name, event.event_type, event.source
            );
        }
    }

    /// Merge consents supplied through the public update API, then notify
    /// other extensions and ask the edge network to record them.
    pub fn handle_consent_update(&mut self, event: &Event) {
        let Some(data) = event.data.as_ref().filter(|d| !d.is_empty()) else {
            debug!("Consent data not found in consent update event. Dropping event.");
            return;
        };

        let fragment = Consents::from_xdm_map(data);
        if fragment.is_empty() {
            debug!("Unable to find valid data from consent update event. Dropping event.");
            return;
        }

        if let Some(merged) = self.merge_and_share(fragment, event) {
            self.dispatch_edge_consent_update(&merged);
        }
    }

    /// Reconcile local consents with a `consent:preferences` handle from the edge.
    pub fn handle_edge_consent_preference(&mut self, event: &Event) {
        let Some(data) = event.data.as_ref().filter(|d| !d.is_empty()) else {
            debug!("Event data not found in edge consent preference event. Dropping event.");
            return;
        };

        let payload = match data.get(data_key::PAYLOAD) {
            Some(Value::Array(items)) if !items.is_empty() => items,
            Some(Value::Array(_)) | None => {
                debug!(
                    "consent:preferences response from edge is missing payload. Dropping event."
                );
                return;
            }
            Some(_) => {
                debug!("Invalid payload from edge server. Dropping event.");
                return;
            }
        };

        let Some(Value::Object(preferences)) = payload.first() else {
            debug!("Invalid payload from edge server. Dropping event.");
            return;
        };

        let fragment = Consents::from_preferences(preferences);
        if fragment.is_empty() {
            debug!("No valid consent data in edge consent preference event. Dropping event.");
            return;
        }

        self.merge_and_share(fragment, event);
    }

    /// Answer a get-consents request. Never answers with an absent payload.
    pub fn handle_request_content(&self, event: &Event) {
        let xdm = self
            .manager
            .current_consents()
            .map(Consents::as_xdm_map)
            .unwrap_or_else(|| Consents::empty().as_xdm_map());

        let response = Event::new(
            event_name::GET_CONSENTS_RESPONSE,
            event_type::CONSENT,
            event_source::RESPONSE_CONTENT,
        )
        .with_data(xdm);

        if let Err(e) = self.api.dispatch_response(response, event) {
            debug!(
                "Failed to dispatch {} event: {}",
                event_name::GET_CONSENTS_RESPONSE,
                e
            );
        }
    }

    /// Apply default consents when the configuration shared state changes.
    pub fn handle_shared_state_change(&mut self, event: &Event) {
        let owner = event
            .data
            .as_ref()
            .and_then(|d| d.get(data_key::STATE_OWNER))
            .and_then(Value::as_str);
        if owner != Some(configuration::EXTENSION_NAME) {
            return;
        }

        let defaults = self.configured_default_consents().unwrap_or_default();
        if !self.manager.update_default_consents(defaults) {
            debug!("Default consents unchanged, nothing to share");
            return;
        }

        let current = self.manager.current_consents().cloned().unwrap_or_default();
        self.share_and_notify(&current, Some(event));
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    fn configured_default_consents(&self) -> Option<Consents> {
        let config = self.api.shared_state(configuration::EXTENSION_NAME)?;
        let defaults = config.get(configuration::DEFAULT_CONSENT)?;
        Some(Consents::from_xdm_value(defaults))
    }

    /// Stamp, merge and persist `fragment`; share the result when it changed.
    ///
    /// Returns the merged consents only when they differ from the previous
    /// state (timestamps ignored).
    fn merge_and_share(&mut self, mut fragment: Consents, event: &Event) -> Option<Consents> {
        fragment.set_timestamp(event.timestamp);

        let previous = self.manager.current_consents().cloned();
        let merged = self.manager.merge_and_persist(&fragment)?;

        if same_ignoring_timestamp(previous.as_ref(), Some(&merged)) {
            debug!("Consents unchanged by {} event, ignoring", event.name);
            return None;
        }

        self.share_and_notify(&merged, Some(event));
        Some(merged)
    }

    fn share_and_notify(&self, consents: &Consents, event: Option<&Event>) {
        if let Err(e) = self.api.set_shared_state(consents.as_xdm_map(), event) {
            debug!("Failed to create XDM shared state: {}", e);
        }

        let notification = Event::new(
            event_name::CONSENT_PREFERENCES_UPDATED,
            event_type::CONSENT,
            event_source::RESPONSE_CONTENT,
        )
        .with_data(consents.as_xdm_map());
        if let Err(e) = self.api.dispatch(notification) {
            debug!(
                "Failed to dispatch {} event: {}",
                event_name::CONSENT_PREFERENCES_UPDATED,
                e
            );
        }
    }

    fn dispatch_edge_consent_update(&self, consents: &Consents) {
        if consents.is_empty() {
            debug!("Consent data is empty, not dispatching Edge Consent Update event.");
            return;
        }

        let update = Event::new(
            event_name::EDGE_CONSENT_UPDATE,
            event_type::EDGE,
            event_source::UPDATE_CONSENT,
        )
        .with_data(consents.as_xdm_map());
        if let Err(e) = self.api.dispatch(update) {
            debug!(
                "Failed to dispatch {} event: {}",
                event_name::EDGE_CONSENT_UPDATE,
                e
            );
        }
    }
}
