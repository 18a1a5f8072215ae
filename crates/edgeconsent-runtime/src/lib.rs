//! Consent runtime — event-driven orchestration of the consent engine.
//!
//! [`ConsentExtension`] turns inbound events into merges on the
//! [`ConsentManager`](edgeconsent_protocol::ConsentManager) and publishes the
//! result as shared state and outbound events through an [`ExtensionApi`].
//! [`EventHub`] is an in-process host that feeds the extension from a single
//! worker task; the [`consent`] module is the public API on top of it.

pub mod consent;
pub mod event;
pub mod extension;
pub mod host;
pub mod hub;

pub use consent::Consent;
pub use event::Event;
pub use extension::ConsentExtension;
pub use host::ExtensionApi;
pub use hub::{EventHub, SharedState};
