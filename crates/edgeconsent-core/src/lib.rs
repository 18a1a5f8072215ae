//! Edge Consent Core — extension identity, event taxonomy, configuration, errors.

pub mod config;
pub mod constants;
pub mod error;

pub use config::ConsentConfig;
pub use error::{Error, Result};
