//! CRM webhook receiver

use crate::api::Ack;
use crate::core::traits::IngestionCoordinator;
use crate::error::ServiceError;
use axum::body::Bytes;
use axum::routing::post;
use axum::{Json, Router};
use di_axum::Inject;
use log::warn;
use serde_json::Value;

pub fn router() -> Router {
    Router::new().route("/ghl", post(receive_crm_event))
}

/// Acknowledges every structurally processable delivery, since the CRM retries non-2xx
/// responses indefinitely. Storage failures still surface as 500 so the retry is useful.
async fn receive_crm_event(
    Inject(coordinator): Inject<dyn IngestionCoordinator>,
    body: Bytes,
) -> Result<Json<Ack>, ServiceError> {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("dropping CRM webhook with unparsable body: {e}");
            return Ok(Ack::ok());
        }
    };

    if !payload.is_object() {
        warn!("dropping CRM webhook whose body is not a JSON object");
        return Ok(Ack::ok());
    }

    coordinator.ingest_webhook(&payload).await?;
    Ok(Ack::ok())
}
