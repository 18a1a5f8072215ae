//! The host services an extension calls into.

use serde_json::{Map, Value};

use crate::event::Event;
use edgeconsent_core::Result;

/// Shared-state publication and event dispatch, scoped to one extension.
pub trait ExtensionApi: Send + Sync {
    /// Publish `state` as this extension's shared state, versioned by `event`.
    fn set_shared_state(&self, state: Map<String, Value>, event: Option<&Event>) -> Result<()>;

    /// Latest shared state published by `owner`.
    fn shared_state(&self, owner: &str) -> Option<Map<String, Value>>;

    fn dispatch(&self, event: Event) -> Result<()>;

    /// Dispatch `response` paired to `request`.
    fn dispatch_response(&self, response: Event, request: &Event) -> Result<()>;
}
