//! Shared application state.

use std::sync::Arc;

use edgeconsent_core::ConsentConfig;
use edgeconsent_runtime::EventHub;
use edgeconsent_store::PreferenceStore;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: ConsentConfig,
    pub hub: EventHub,
}

impl AppState {
    /// Start the event hub over `store`. Must run inside the tokio runtime.
    pub fn new(config: ConsentConfig, store: Arc<dyn PreferenceStore>) -> Self {
        let hub = EventHub::start(store, &config);
        Self { config, hub }
    }
}
