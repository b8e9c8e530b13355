//! Admin API.
//!
//! # Endpoints
//! - `GET  /admin/status`: version and breaker count
//! - `GET  /admin/breakers`: snapshot of every breaker
//! - `GET  /admin/health`: health partition (503 when degraded)
//! - `POST /admin/breakers/reset`: reset every breaker
//! - `POST /admin/breakers/{name}/reset`: reset one breaker (404 if unknown)
//!
//! All endpoints require `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::resilience::CircuitBreakerManager;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub manager: Arc<CircuitBreakerManager>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(manager: Arc<CircuitBreakerManager>, api_key: &str) -> Self {
        Self {
            manager,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breakers", get(get_breakers))
        .route("/admin/health", get(get_health))
        .route("/admin/breakers/reset", post(reset_all))
        .route("/admin/breakers/{name}/reset", post(reset_one))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    const KEY: &str = "test-key";

    fn router() -> (Router, Arc<CircuitBreakerManager>) {
        let manager = Arc::new(CircuitBreakerManager::new());
        manager.get_breaker("ai", None).unwrap();
        manager.get_breaker("email", None).unwrap();
        (setup_admin_router(AdminState::new(manager.clone(), KEY)), manager)
    }

    fn request(method: &str, uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let (app, _) = router();

        let res = app.clone().oneshot(request("GET", "/admin/status", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app.oneshot(request("GET", "/admin/status", Some("wrong"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_breakers_listing() {
        let (app, manager) = router();
        let ai = manager.get_breaker("ai", None).unwrap();
        ai.execute(|| async { Ok::<_, String>(()) }).await.unwrap();
        ai.execute(|| async { Err::<(), _>("model overloaded".to_string()) })
            .await
            .unwrap_err();

        let res = app.oneshot(request("GET", "/admin/breakers", Some(KEY))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = json(res).await;
        assert_eq!(body["ai"]["state"], "CLOSED");
        assert_eq!(body["ai"]["success_rate"], 50.0);
        assert!(body["ai"]["uptime_ms"].is_u64());
        assert_eq!(body["email"]["failure_threshold"], 3);
        assert_eq!(body["email"]["success_rate"], 0.0);
    }

    #[tokio::test]
    async fn test_reset_accepts_encoded_names() {
        let (app, manager) = router();
        let breaker = manager.get_breaker("email/eu west", None).unwrap();
        breaker.force_open();

        let res = app
            .oneshot(request("POST", "/admin/breakers/email%2Feu%20west/reset", Some(KEY)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(breaker.is_healthy());
    }

    #[tokio::test]
    async fn test_health_reports_degraded() {
        let (app, manager) = router();

        let res = app.clone().oneshot(request("GET", "/admin/health", Some(KEY))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json(res).await["overall"], "HEALTHY");

        manager.get_breaker("ai", None).unwrap().force_open();
        let res = app.oneshot(request("GET", "/admin/health", Some(KEY))).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = json(res).await;
        assert_eq!(body["overall"], "DEGRADED");
        assert_eq!(body["unhealthy"][0]["name"], "ai");
        assert_eq!(body["unhealthy"][0]["snapshot"]["state"], "OPEN");
    }

    #[tokio::test]
    async fn test_reset_endpoints() {
        let (app, manager) = router();
        let ai = manager.get_breaker("ai", None).unwrap();
        ai.force_open();

        let res = app
            .clone()
            .oneshot(request("POST", "/admin/breakers/ai/reset", Some(KEY)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(ai.is_healthy());

        let res = app
            .clone()
            .oneshot(request("POST", "/admin/breakers/missing/reset", Some(KEY)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        ai.force_open();
        let res = app
            .oneshot(request("POST", "/admin/breakers/reset", Some(KEY)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json(res).await["reset"], serde_json::json!(["ai", "email"]));
        assert!(ai.is_healthy());
    }
}
