//! Consent protocol — preference model, merge engine, persistence.
//!
//! Consent preferences are a schema-less tree of categories, leaf consents
//! (`{"val": "y"}`) and free-form terminals such as `marketing.preferred`.
//! [`Consents`] owns one such tree and implements the deep merge that
//! reconciles partial updates with existing state; [`ConsentManager`] keeps
//! the current state and writes it through a
//! [`PreferenceStore`](edgeconsent_store::PreferenceStore).

pub mod builder;
pub mod consents;
pub mod manager;
pub mod node;
pub mod value;

pub use builder::ConsentsBuilder;
pub use consents::Consents;
pub use manager::ConsentManager;
pub use node::{ConsentMap, ConsentNode};
pub use value::ConsentValue;
