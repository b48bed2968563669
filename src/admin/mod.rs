//! Read-only status surface over the traffic controller.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};

use self::handlers::*;
use crate::traffic::TrafficController;

pub fn setup_admin_router(controller: Arc<TrafficController>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/traffic/scopes", get(list_scopes))
        .route("/admin/traffic/scopes/{scope}", get(get_scope))
        .with_state(controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::resilience::Outcome;
    use crate::traffic::ScopeKey;

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let res = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_scope_listing_and_lookup() {
        let controller = Arc::new(TrafficController::default());
        let openai = ScopeKey::outbound("openai");
        controller.acquire_key(&openai).unwrap();
        controller.record(&openai, Outcome::Status(200));
        controller.acquire_key(&ScopeKey::inbound("chat")).unwrap();

        let app = setup_admin_router(controller);

        let (status, json) = get_json(&app, "/admin/traffic/scopes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["scope"], "provider:openai");

        let (status, json) = get_json(&app, "/admin/traffic/scopes/provider:openai").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["direction"], "outbound");
        assert_eq!(json["telemetry"]["total_2xx"], 1);
        assert_eq!(json["breaker"]["state"], "closed");

        let (status, json) = get_json(&app, "/admin/traffic/scopes/endpoint-group:chat").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["breaker"].is_null());

        let (status, json) = get_json(&app, "/admin/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["outbound_scopes"], 1);
        assert_eq!(json["inbound_scopes"], 1);
    }

    #[tokio::test]
    async fn test_unknown_scope_is_404() {
        let app = setup_admin_router(Arc::new(TrafficController::default()));

        let (status, json) = get_json(&app, "/admin/traffic/scopes/provider:nobody").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "scope_not_found");

        let (status, _) = get_json(&app, "/admin/traffic/scopes/garbage").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
