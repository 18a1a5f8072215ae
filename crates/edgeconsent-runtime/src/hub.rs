//! In-process event hub hosting the consent extension.
//!
//! Inbound events are queued on an unbounded channel and handled by a single
//! worker task that owns the [`ConsentExtension`], so handlers run strictly in
//! order. Events the extension dispatches are broadcast to subscribers and
//! kept in a bounded history; responses are also routed to whoever awaits
//! the request.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::event::Event;
use crate::extension::ConsentExtension;
use crate::host::ExtensionApi;
use edgeconsent_core::constants::{configuration, EXTENSION_NAME};
use edgeconsent_core::{ConsentConfig, Error, Result};
use edgeconsent_protocol::ConsentManager;
use edgeconsent_store::PreferenceStore;

const OUTBOUND_CAPACITY: usize = 256;

/// Most recent dispatched events kept for observation.
pub const HISTORY_CAPACITY: usize = 256;

/// Latest published shared state of one extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedState {
    pub version: u64,
    #[serde(rename = "eventId", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,
    pub data: Map<String, Value>,
}

struct HubInner {
    shared_states: RwLock<HashMap<String, SharedState>>,
    pending: Mutex<HashMap<Uuid, oneshot::Sender<Event>>>,
    history: RwLock<VecDeque<Event>>,
    dispatched_count: AtomicU64,
    outbound: broadcast::Sender<Event>,
}

impl HubInner {
    fn publish_state(&self, owner: &str, data: Map<String, Value>, event_id: Option<Uuid>) -> u64 {
        let mut states = self.shared_states.write();
        let version = states.get(owner).map_or(0, |s| s.version) + 1;
        states.insert(
            owner.to_string(),
            SharedState {
                version,
                event_id,
                data,
            },
        );
        version
    }

    fn latest_state(&self, owner: &str) -> Option<SharedState> {
        self.shared_states.read().get(owner).cloned()
    }

    fn record(&self, event: Event) {
        {
            let mut history = self.history.write();
            if history.len() == HISTORY_CAPACITY {
                history.pop_front();
            }
            history.push_back(event.clone());
        }
        self.dispatched_count.fetch_add(1, Ordering::Relaxed);
        // No subscribers is fine.
        let _ = self.outbound.send(event);
    }
}

/// The [`ExtensionApi`] handed to a registered extension.
struct ExtensionContext {
    hub: Arc<HubInner>,
    owner: String,
}

impl ExtensionApi for ExtensionContext {
    fn set_shared_state(&self, state: Map<String, Value>, event: Option<&Event>) -> Result<()> {
        let version = self.hub.publish_state(&self.owner, state, event.map(|e| e.id));
        debug!("Shared state v{} published for {}", version, self.owner);
        Ok(())
    }

    fn shared_state(&self, owner: &str) -> Option<Map<String, Value>> {
        self.hub.latest_state(owner).map(|s| s.data)
    }

    fn dispatch(&self, event: Event) -> Result<()> {
        debug!("Dispatching {} from {}", event.name, self.owner);
        self.hub.record(event);
        Ok(())
    }

    fn dispatch_response(&self, mut response: Event, request: &Event) -> Result<()> {
        response.response_id = Some(request.id);
        self.hub.record(response.clone());

        if let Some(waiter) = self.hub.pending.lock().remove(&request.id) {
            waiter
                .send(response)
                .map_err(|_| Error::Dispatch(format!("requester of {} went away", request.id)))?;
        }
        Ok(())
    }
}

/// Hosts one [`ConsentExtension`] on a dedicated worker task.
pub struct EventHub {
    inner: Arc<HubInner>,
    sender: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    response_timeout: Duration,
}

impl EventHub {
    /// Register the consent extension over `store` and start the worker.
    ///
    /// Default consents from `config` are published as configuration shared
    /// state before registration. Must be called inside a tokio runtime.
    pub fn start(store: Arc<dyn PreferenceStore>, config: &ConsentConfig) -> Self {
        let (outbound, _) = broadcast::channel(OUTBOUND_CAPACITY);
        let inner = Arc::new(HubInner {
            shared_states: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            history: RwLock::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
            dispatched_count: AtomicU64::new(0),
            outbound,
        });

        if let Some(defaults) = &config.default_consents {
            let mut state = Map::new();
            state.insert(configuration::DEFAULT_CONSENT.to_string(), defaults.clone());
            inner.publish_state(configuration::EXTENSION_NAME, state, None);
        }

        let api = Arc::new(ExtensionContext {
            hub: inner.clone(),
            owner: EXTENSION_NAME.to_string(),
        });
        let mut extension = ConsentExtension::new(api, ConsentManager::new(store));
        extension.on_registered();

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                extension.handle_event(&event);
            }
            debug!("Event hub worker stopped");
        });

        info!("EventHub: started with {}", EXTENSION_NAME);

        Self {
            inner,
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            response_timeout: config.response_timeout(),
        }
    }

    /// Queue `event` for the extension.
    pub fn dispatch(&self, event: Event) -> Result<()> {
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return Err(Error::Dispatch("event hub is shut down".into()));
        };
        tx.send(event)
            .map_err(|e| Error::Dispatch(format!("event hub worker unavailable: {}", e.0.name)))
    }

    /// Queue `event` and wait for the response paired to it.
    pub async fn dispatch_with_response(&self, event: Event, timeout: Duration) -> Result<Event> {
        let id = event.id;
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(id, tx);

        if let Err(e) = self.dispatch(event) {
            self.inner.pending.lock().remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(Error::Dispatch(format!("no response to {}", id))),
            Err(_) => {
                self.inner.pending.lock().remove(&id);
                warn!("Timed out after {:?} waiting for response to {}", timeout, id);
                Err(Error::Timeout(format!(
                    "no response to {} within {}ms",
                    id,
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Publish a new configuration shared state and notify the extension.
    pub fn set_configuration(&self, config: Map<String, Value>) -> Result<()> {
        let version = self
            .inner
            .publish_state(configuration::EXTENSION_NAME, config, None);
        debug!("Configuration shared state v{} published", version);
        self.dispatch(Event::shared_state_change(configuration::EXTENSION_NAME))
    }

    /// Every event the extension dispatches from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.outbound.subscribe()
    }

    pub fn shared_state(&self, owner: &str) -> Option<SharedState> {
        self.inner.latest_state(owner)
    }

    /// The last [`HISTORY_CAPACITY`] events dispatched by the extension, oldest first.
    pub fn dispatched_events(&self) -> Vec<Event> {
        self.inner.history.read().iter().cloned().collect()
    }

    /// Total number of events dispatched since start, including evicted ones.
    pub fn dispatched_count(&self) -> u64 {
        self.inner.dispatched_count.load(Ordering::Relaxed)
    }

    /// Timeout applied by the public API when awaiting responses.
    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Close the queue and wait for queued events to be handled.
    pub async fn shutdown(&self) {
        self.sender.lock().take();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!("Event hub worker ended abnormally: {}", e);
            }
        }
        info!("EventHub: shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgeconsent_core::constants::{datastore, event_name};
    use edgeconsent_protocol::ConsentsBuilder;
    use edgeconsent_store::MemoryStore;
    use serde_json::json;

    fn config(dir: &tempfile::TempDir) -> ConsentConfig {
        ConsentConfig::new(dir.path()).unwrap()
    }

    fn hub(dir: &tempfile::TempDir) -> EventHub {
        EventHub::start(Arc::new(MemoryStore::new(datastore::NAME)), &config(dir))
    }

    #[tokio::test]
    async fn test_update_is_handled_and_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(&dir);
        let mut outbound = hub.subscribe();

        let xdm = ConsentsBuilder::new().collect("y").build_xdm_map();
        hub.dispatch(Event::consent_update_request(xdm)).unwrap();

        let first = outbound.recv().await.unwrap();
        assert_eq!(first.name, event_name::CONSENT_PREFERENCES_UPDATED);
        let second = outbound.recv().await.unwrap();
        assert_eq!(second.name, event_name::EDGE_CONSENT_UPDATE);

        let state = hub.shared_state(EXTENSION_NAME).unwrap();
        assert_eq!(state.version, 1);
        assert_eq!(state.data["consents"]["collect"], json!({"val": "y"}));
    }

    #[tokio::test]
    async fn test_dispatch_with_response_pairs_response() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(&dir);
        let request = Event::get_consents_request();
        let request_id = request.id;

        let response = hub
            .dispatch_with_response(request, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.response_id, Some(request_id));
        assert_eq!(Value::Object(response.data.unwrap()), json!({"consents": {}}));
    }

    #[tokio::test]
    async fn test_dispatch_with_response_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(&dir);
        // Nothing answers an update request.
        let request = Event::consent_update_request(Map::new());
        let err = hub
            .dispatch_with_response(request, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert!(hub.inner.pending.lock().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue_and_rejects_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(&dir);
        let xdm = ConsentsBuilder::new().ad_id("n").build_xdm_map();
        hub.dispatch(Event::consent_update_request(xdm)).unwrap();
        hub.shutdown().await;

        assert_eq!(hub.dispatched_events().len(), 2);
        let err = hub.dispatch(Event::get_consents_request()).unwrap_err();
        assert!(matches!(err, Error::Dispatch(_)));
    }

    #[tokio::test]
    async fn test_configured_defaults_are_shared_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir);
        config.default_consents = Some(ConsentsBuilder::new().collect("n").build_value());
        let hub = EventHub::start(Arc::new(MemoryStore::new(datastore::NAME)), &config);

        let state = hub.shared_state(EXTENSION_NAME).unwrap();
        assert_eq!(state.event_id, None);
        assert_eq!(state.data["consents"]["collect"], json!({"val": "n"}));
    }

    #[tokio::test]
    async fn test_set_configuration_versions_shared_state() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(&dir);
        let mut config = Map::new();
        config.insert(
            configuration::DEFAULT_CONSENT.to_string(),
            ConsentsBuilder::new().collect("y").build_value(),
        );
        hub.set_configuration(config.clone()).unwrap();
        hub.set_configuration(config).unwrap();
        hub.shutdown().await;

        assert_eq!(hub.shared_state(configuration::EXTENSION_NAME).unwrap().version, 2);
        // second identical configuration changes nothing
        assert_eq!(hub.shared_state(EXTENSION_NAME).unwrap().version, 1);
        assert_eq!(hub.dispatched_events().len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded_and_state_not_retained() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(&dir);

        let updates = HISTORY_CAPACITY + 50;
        for i in 0..updates {
            let value = if i % 2 == 0 { "y" } else { "n" };
            let xdm = ConsentsBuilder::new().collect(value).build_xdm_map();
            hub.dispatch(Event::consent_update_request(xdm)).unwrap();
        }
        hub.shutdown().await;

        // each update dispatches a notification and an edge update
        assert_eq!(hub.dispatched_count(), 2 * updates as u64);
        let history = hub.dispatched_events();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.last().unwrap().name, event_name::EDGE_CONSENT_UPDATE);

        let state = hub.shared_state(EXTENSION_NAME).unwrap();
        assert_eq!(state.version, updates as u64);
        assert_eq!(hub.inner.shared_states.read().len(), 1);
    }
}
