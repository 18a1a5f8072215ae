//! Consent routes — update, read, edge responses, configuration, events.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::state::AppState;
use edgeconsent_core::Error;
use edgeconsent_runtime::{Consent, Event};

// ---------------------------------------------------------------
// Route builder
// ---------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/consents", get(get_consents).post(update_consents))
        .route("/edge/preferences", post(edge_preferences))
        .route("/configuration", post(update_configuration))
        .route("/events", get(list_events))
}

// ---------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------

/// POST /api/consents — merge an XDM consents map.
async fn update_consents(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let xdm = match expect_object(body) {
        Ok(xdm) => xdm,
        Err(rejection) => return rejection,
    };

    accepted(Consent::update(&state.hub, xdm))
}

/// GET /api/consents — current consents in XDM format.
async fn get_consents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match Consent::get_consents(&state.hub).await {
        Ok(consents) => (StatusCode::OK, Json(Value::Object(consents))),
        Err(e) => {
            warn!("Get consents failed: {}", e);
            let status = match e {
                Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": e.to_string() })))
        }
    }
}

/// POST /api/edge/preferences — inject a `consent:preferences` edge response.
async fn edge_preferences(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let data = match expect_object(body) {
        Ok(data) => data,
        Err(rejection) => return rejection,
    };

    let mut event = Event::edge_consent_preference(Vec::new());
    event.data = Some(data);
    accepted(state.hub.dispatch(event))
}

/// POST /api/configuration — publish a new configuration shared state.
async fn update_configuration(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let config = match expect_object(body) {
        Ok(config) => config,
        Err(rejection) => return rejection,
    };

    accepted(state.hub.set_configuration(config))
}

/// GET /api/events — most recent events dispatched by the extension.
async fn list_events(State(state): State<Arc<AppState>>) -> Json<Value> {
    let events = state.hub.dispatched_events();
    Json(json!({
        "retained": events.len(),
        "total": state.hub.dispatched_count(),
        "events": events,
    }))
}

// ---------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------

fn expect_object(body: Value) -> Result<Map<String, Value>, (StatusCode, Json<Value>)> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Request body must be a JSON object" })),
        )),
    }
}

fn accepted(result: edgeconsent_core::Result<()>) -> (StatusCode, Json<Value>) {
    match result {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "success": true }))),
        Err(e) => {
            warn!("Dispatch failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}
