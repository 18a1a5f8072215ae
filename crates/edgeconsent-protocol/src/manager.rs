//! Consent manager — owns current consents, merges updates, persists.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::consents::{same_ignoring_timestamp, Consents};
use edgeconsent_core::constants::datastore;
use edgeconsent_store::PreferenceStore;

/// Holds the consents of this device and writes them to a [`PreferenceStore`].
///
/// Current consents are the configuration defaults overlaid with the
/// consents the user opted into. Only the user's consents are persisted.
pub struct ConsentManager {
    store: Arc<dyn PreferenceStore>,
    storage_key: String,
    user_consents: Option<Consents>,
    default_consents: Option<Consents>,
    current: Option<Consents>,
}

impl ConsentManager {
    /// Create a manager and load previously persisted consents.
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self::with_key(store, datastore::CONSENT_PREFERENCES)
    }

    pub fn with_key(store: Arc<dyn PreferenceStore>, storage_key: impl Into<String>) -> Self {
        let storage_key = storage_key.into();
        let user_consents = load_consents(store.as_ref(), &storage_key);
        info!(
            "ConsentManager: {} persisted consents in {}",
            if user_consents.is_some() { "loaded" } else { "no" },
            store.name()
        );

        let mut manager = Self {
            store,
            storage_key,
            user_consents,
            default_consents: None,
            current: None,
        };
        manager.refresh_current();
        manager
    }

    /// Merge `fragment` into the user's consents and persist the result.
    ///
    /// Empty fragments change nothing and write nothing. Persistence
    /// failures are logged; the in-memory state stays authoritative.
    /// Returns a copy of the current consents.
    pub fn merge_and_persist(&mut self, fragment: &Consents) -> Option<Consents> {
        if fragment.is_empty() {
            debug!("Empty consents fragment, nothing to merge");
            return self.current.clone();
        }

        match self.user_consents.as_mut() {
            Some(user) => user.merge(fragment),
            None => self.user_consents = Some(fragment.clone()),
        }

        self.save();
        self.refresh_current();
        self.current.clone()
    }

    /// Defaults overlaid with user consents; `None` when there are none.
    pub fn current_consents(&self) -> Option<&Consents> {
        self.current.as_ref()
    }

    /// Consents the user opted into, as persisted.
    pub fn user_consents(&self) -> Option<&Consents> {
        self.user_consents.as_ref()
    }

    pub fn default_consents(&self) -> Option<&Consents> {
        self.default_consents.as_ref()
    }

    /// Replace the configuration defaults.
    ///
    /// Returns true when the current consents changed (timestamps ignored).
    pub fn update_default_consents(&mut self, defaults: Consents) -> bool {
        let previous = self.current.clone();
        self.default_consents = (!defaults.is_empty()).then_some(defaults);
        self.refresh_current();
        !same_ignoring_timestamp(previous.as_ref(), self.current.as_ref())
    }

    fn refresh_current(&mut self) {
        let mut current = Consents::copy_of(self.default_consents.as_ref());
        if let Some(user) = &self.user_consents {
            current.merge(user);
        }
        self.current = (!current.is_empty()).then_some(current);
    }

    // ---------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------

    fn save(&self) {
        // User consents only grow, so an empty blob is never written.
        let Some(user) = self.user_consents.as_ref().filter(|c| !c.is_empty()) else {
            return;
        };

        match user.to_json_string() {
            Ok(json) => {
                if let Err(e) = self.store.put(&self.storage_key, &json) {
                    warn!("Failed to persist consents: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize consents: {}", e),
        }
    }
}

fn load_consents(store: &dyn PreferenceStore, key: &str) -> Option<Consents> {
    let json = match store.get(key) {
        Ok(Some(json)) => json,
        Ok(None) => {
            debug!("No previous consents were stored in persistence");
            return None;
        }
        Err(e) => {
            debug!("Unable to read consents from persistence: {}", e);
            return None;
        }
    };

    match Consents::from_json_str(&json) {
        Ok(consents) if !consents.is_empty() => Some(consents),
        Ok(_) => None,
        Err(e) => {
            debug!("Persisted consents are not valid JSON, ignoring: {}", e);
            None
        }
    }
}
