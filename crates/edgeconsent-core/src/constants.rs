//! Extension identity, event taxonomy and data keys shared across crates.

/// Unique name this extension registers under; also owns its shared state.
pub const EXTENSION_NAME: &str = "com.adobe.edge.consent";
pub const FRIENDLY_NAME: &str = "Consent";
pub const EXTENSION_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Keys used inside event data and the consents wire shape.
pub mod data_key {
    pub const CONSENTS: &str = "consents";
    pub const METADATA: &str = "metadata";
    pub const TIME: &str = "time";
    pub const VALUE: &str = "val";
    pub const PAYLOAD: &str = "payload";
    pub const TYPE: &str = "type";
    pub const STATE_OWNER: &str = "stateowner";
}

/// Local persistence location.
pub mod datastore {
    pub const NAME: &str = super::EXTENSION_NAME;
    pub const CONSENT_PREFERENCES: &str = "consent:preferences";
}

pub mod event_type {
    pub const CONSENT: &str = "com.adobe.eventType.consent";
    pub const EDGE: &str = "com.adobe.eventType.edge";
    pub const HUB: &str = "com.adobe.eventType.hub";
}

pub mod event_source {
    pub const CONSENT_PREFERENCE: &str = "consent:preferences";
    pub const UPDATE_CONSENT: &str = "com.adobe.eventSource.updateConsent";
    pub const REQUEST_CONTENT: &str = "com.adobe.eventSource.requestContent";
    pub const RESPONSE_CONTENT: &str = "com.adobe.eventSource.responseContent";
    pub const SHARED_STATE: &str = "com.adobe.eventSource.sharedState";
}

pub mod event_name {
    pub const CONSENT_UPDATE_REQUEST: &str = "Consent Update Request";
    pub const EDGE_CONSENT_UPDATE: &str = "Edge Consent Update Request";
    pub const EDGE_CONSENT_PREFERENCE: &str = "Edge Consent Preference Response";
    pub const GET_CONSENTS_REQUEST: &str = "Get Consents Request";
    pub const GET_CONSENTS_RESPONSE: &str = "Get Consents Response";
    pub const CONSENT_PREFERENCES_UPDATED: &str = "Consent Preferences Updated";
    pub const SHARED_STATE_CHANGE: &str = "Shared state change";
}

/// Configuration extension identity and the keys read from its shared state.
pub mod configuration {
    pub const EXTENSION_NAME: &str = "com.adobe.module.configuration";
    pub const DEFAULT_CONSENT: &str = "consent.default";
}
