//! HTTP routes for the webhook gateway.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;

use crate::error::WebhookError;
use crate::gateway::WebhookGateway;

/// Creates an Axum router with the webhook and health routes.
///
/// # Example
///
/// ```rust,ignore
/// let app = webhook_routes(Arc::new(WebhookGateway::new(context)));
/// axum::serve(listener, app).await?;
/// ```
pub fn webhook_routes<S>(gateway: Arc<WebhookGateway>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/webhook", post(webhook_handler))
        .route("/healthz", get(health_handler))
        .with_state(gateway)
}

async fn webhook_handler(
    State(gateway): State<Arc<WebhookGateway>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match gateway.accept(&headers, &body).await {
        Ok(_) => StatusCode::ACCEPTED.into_response(),
        Err(e) => e.into_response(),
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
