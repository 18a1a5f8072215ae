//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::constants::datastore;
use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 3010;
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 5000;

/// Top-level Edge Consent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// HTTP server port.
    pub port: u16,
    /// Root data directory (e.g., `data/`).
    pub data_dir: PathBuf,
    /// SQLite preference store (`data/consent.db`).
    pub db_path: PathBuf,
    /// Named local store the consent blob is kept in.
    pub datastore_name: String,
    /// How long a get-consents request waits for its paired response.
    pub response_timeout_ms: u64,
    /// Configuration-supplied default consents in XDM format.
    #[serde(default)]
    pub default_consents: Option<serde_json::Value>,
}

impl ConsentConfig {
    /// Build a configuration rooted at `data_dir` with defaults. Creates the directory.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            port: DEFAULT_PORT,
            db_path: data_dir.join("consent.db"),
            data_dir,
            datastore_name: datastore::NAME.to_string(),
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            default_consents: None,
        })
    }

    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::new(data_dir)?;

        config.port = std::env::var("EDGECONSENT_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        config.response_timeout_ms = std::env::var("EDGECONSENT_RESPONSE_TIMEOUT_MS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_RESPONSE_TIMEOUT_MS);

        if let Ok(raw) = std::env::var("EDGECONSENT_DEFAULT_CONSENTS") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                config.default_consents = Some(parse_default_consents(trimmed)?);
                info!("Default consents loaded from EDGECONSENT_DEFAULT_CONSENTS");
            }
        }

        Ok(config)
    }

    pub fn response_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.response_timeout_ms)
    }
}

fn parse_default_consents(raw: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(Error::Config(
            "EDGECONSENT_DEFAULT_CONSENTS must be a JSON object".into(),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConsentConfig::new(dir.path().join("data")).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.datastore_name, "com.adobe.edge.consent");
        assert!(config.db_path.ends_with("consent.db"));
        assert!(config.data_dir.exists());
        assert!(config.default_consents.is_none());
    }

    #[test]
    fn test_default_consents_must_be_object() {
        assert!(parse_default_consents("[1, 2]").is_err());
        assert!(parse_default_consents("not json").is_err());

        let value =
            parse_default_consents(r#"{"consents": {"collect": {"val": "y"}}}"#).unwrap();
        assert_eq!(value["consents"]["collect"]["val"], "y");
    }
}
