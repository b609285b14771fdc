//! HTTP endpoints: send-message, create-user-tables, health.
//!
//! Every response, errors included, carries permissive CORS headers.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderName, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::pipeline::types::parse_body;
use crate::pipeline::{
    InboundRequest, MessagePipeline, ProvisionRequest, ResponseEnvelope, TenantProvisioner,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MessagePipeline>,
    pub provisioner: Arc<TenantProvisioner>,
}

/// Build the Axum router with both endpoints.
pub fn app_routes(pipeline: Arc<MessagePipeline>, provisioner: Arc<TenantProvisioner>) -> Router {
    let state = AppState {
        pipeline,
        provisioner,
    };

    Router::new()
        .route("/health", get(health))
        .route("/send-message", post(send_message))
        .route("/create-user-tables", post(create_user_tables))
        .with_state(state)
        .layer(cors_layer())
}

/// Permissive CORS on every response. The layer also answers every OPTIONS
/// request itself, so no route handles OPTIONS.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::POST,
            Method::GET,
            Method::OPTIONS,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code)
            .ok()
            .filter(|s| s.as_u16() <= 599)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "inbox-buckets"
    }))
}

// ── Endpoints ───────────────────────────────────────────────────────────

async fn send_message(State(state): State<AppState>, body: Bytes) -> ResponseEnvelope {
    match parse_body::<InboundRequest>(&body) {
        Ok(request) => state.pipeline.handle(request).await,
        Err(e) => {
            warn!(error = %e, "Rejected send-message body");
            ResponseEnvelope::from_error(&e)
        }
    }
}

async fn create_user_tables(State(state): State<AppState>, body: Bytes) -> ResponseEnvelope {
    match parse_body::<ProvisionRequest>(&body) {
        Ok(request) => state.provisioner.handle(request).await,
        Err(e) => {
            warn!(error = %e, "Rejected create-user-tables body");
            ResponseEnvelope::from_error(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_status_follows_code() {
        let response = ResponseEnvelope::success().into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let response = ResponseEnvelope::error(404, "missing").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn out_of_range_code_falls_back_to_500() {
        let response = ResponseEnvelope::error(42, "weird").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ResponseEnvelope::error(799, "weird").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
