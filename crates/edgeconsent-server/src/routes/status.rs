//! Extension status route.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;
use edgeconsent_core::constants::{EXTENSION_NAME, FRIENDLY_NAME};
use edgeconsent_runtime::Consent;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}

/// GET /api/status — extension identity and host settings.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "extension": EXTENSION_NAME,
        "friendlyName": FRIENDLY_NAME,
        "version": Consent::extension_version(),
        "datastore": state.config.datastore_name,
        "responseTimeoutMs": state.config.response_timeout_ms,
        "eventsDispatched": state.hub.dispatched_count(),
    }))
}
