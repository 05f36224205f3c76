use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod handlers;

/// Sync API routes. All paths are relative; `app` mounts them under `/api/v1`.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/sync/import/organization/:org_id",
            post(handlers::import_organization),
        )
        .route("/sync/import/search", post(handlers::import_search))
        .route(
            "/sync/import/animal/:petfinder_id",
            post(handlers::import_animal),
        )
        .route("/sync/dogs/upload-pending", post(handlers::upload_pending))
        .route("/sync/dogs/:id/upload", post(handlers::upload_dog))
        .route("/sync/connection", get(handlers::test_connection))
        .route("/sync/status", get(handlers::sync_status))
        .fallback(fallback_404)
}

/// Full application router with health check and tracing.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .nest("/api/v1", api_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Tag every response with an `x-request-id` for log correlation.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}
