//! Dashboard rollups

use crate::core::traits::{DashboardSummary, SummaryService};
use crate::error::ServiceError;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use serde::Serialize;

pub fn router() -> Router {
    Router::new().route("/summary", get(summary))
}

#[derive(Serialize, Debug)]
pub struct SummaryResponse {
    pub summary: DashboardSummary,
}

async fn summary(
    Inject(summary_service): Inject<dyn SummaryService>,
) -> Result<Json<SummaryResponse>, ServiceError> {
    let summary = summary_service.dashboard_summary().await?;
    Ok(Json(SummaryResponse { summary }))
}
