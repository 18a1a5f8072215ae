//! HTTP route handlers.

pub mod consent;
pub mod status;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .merge(consent::routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use edgeconsent_core::constants::datastore;
    use edgeconsent_core::ConsentConfig;
    use edgeconsent_store::MemoryStore;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_state(dir: &tempfile::TempDir) -> Arc<AppState> {
        let config = ConsentConfig::new(dir.path()).unwrap();
        Arc::new(AppState::new(config, Arc::new(MemoryStore::new(datastore::NAME))))
    }

    async fn call(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_status_reports_extension() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let (status, body) = call(app, Method::GET, "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["extension"], "com.adobe.edge.consent");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["eventsDispatched"], 0);
    }

    #[tokio::test]
    async fn test_update_then_get_consents() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (status, body) =
            call(build_router(state.clone()), Method::GET, "/api/consents", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"consents": {}}));

        let (status, _) = call(
            build_router(state.clone()),
            Method::POST,
            "/api/consents",
            Some(json!({"consents": {"collect": {"val": "y"}}})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (_, body) =
            call(build_router(state.clone()), Method::GET, "/api/consents", None).await;
        assert_eq!(body["consents"]["collect"], json!({"val": "y"}));

        let (_, events) = call(build_router(state), Method::GET, "/api/events", None).await;
        let names: Vec<&str> = events["events"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["name"].as_str())
            .collect();
        assert!(names.contains(&"Edge Consent Update Request"));
        assert!(names.contains(&"Consent Preferences Updated"));
        // two get-consents responses plus the update's two events
        assert_eq!(events["total"], 4);
        assert_eq!(events["retained"], 4);
    }

    #[tokio::test]
    async fn test_update_rejects_non_object_body() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let body = Some(json!(["collect"]));
        let (status, body) = call(app, Method::POST, "/api/consents", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_edge_preferences_and_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (status, _) = call(
            build_router(state.clone()),
            Method::POST,
            "/api/configuration",
            Some(json!({"consent.default": {"consents": {"collect": {"val": "y"}}}})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, _) = call(
            build_router(state.clone()),
            Method::POST,
            "/api/edge/preferences",
            Some(json!({"payload": [{"adID": {"val": "n"}}], "type": "consent:preferences"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (_, body) = call(build_router(state), Method::GET, "/api/consents", None).await;
        assert_eq!(body["consents"]["collect"], json!({"val": "y"}));
        assert_eq!(body["consents"]["adID"], json!({"val": "n"}));
    }
}
