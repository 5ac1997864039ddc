use crate::error::ServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use di::ServiceProvider;
use di_axum::RouterServiceProviderExtensions;
use log::error;
use serde::Serialize;
use serde_json::{Value, json};

pub mod conversations;
pub mod dashboard;
pub mod locations;
pub mod webhooks;

/// `{ "ok": true }`
#[derive(Serialize, Debug)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    pub fn ok() -> Json<Ack> {
        Json(Ack { ok: true })
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::ChannelDisabled(_) => StatusCode::FORBIDDEN,
            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status.is_server_error() {
            error!("request failed: {self}");
            "internal error".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// All HTTP routes, with services resolved from `provider`.
pub fn router(provider: ServiceProvider) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .nest("/webhooks", webhooks::router())
        .nest("/api/conversations", conversations::router())
        .nest("/api/locations", locations::router())
        .nest("/api/widget", locations::widget_router())
        .nest("/api/dashboard", dashboard::router())
        .with_provider(provider)
}

async fn index() -> Json<Value> {
    Json(json!({ "name": "support-inbox-api" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "time": Utc::now().to_rfc3339() }))
}
