use std::sync::Arc;

use axum::extract::{Query, State};
use axum::{Json, debug_handler};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::server::{AppState, JsonResult, RouteError};
use crate::db::models::{PaginatedResponse, Pagination};
use crate::db::models::trending::TrendingSnapshot;
use crate::db::repositories::trending::{PgTrendingRepository, TrendingStore};
use crate::ingest::queue::IngestJob;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct IngestAccepted {
    pub job_id: String,
}

/// Most recent snapshot, or 404 while no cycle has completed yet.
#[instrument(skip(state))]
pub async fn latest_trending(
    State(state): State<Arc<AppState>>,
) -> JsonResult<TrendingSnapshot> {
    let repo = PgTrendingRepository::new(state.db_pool);

    match repo.latest().await? {
        Some(snapshot) => Ok(Json(snapshot)),
        None => Err(RouteError::NoSnapshot),
    }
}

#[instrument(skip(state))]
pub async fn trending_history(
    Query(param): Query<Pagination>,
    State(state): State<Arc<AppState>>,
) -> JsonResult<PaginatedResponse<TrendingSnapshot>> {
    let limit = param.limit;
    let offset = param.page * limit;

    let repo = PgTrendingRepository::new(state.db_pool);
    let segment = repo.history(limit, offset).await?;

    Ok(Json(segment))
}

/// Accepts one posted content body and enqueues it for ingestion. The
/// response only acknowledges the enqueue; counter updates happen whenever
/// the worker gets to the job.
#[instrument(skip(state, req))]
#[debug_handler]
pub async fn ingest_content_body(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestAccepted>), RouteError> {
    let job = IngestJob::new(req.body);
    let job_id = job.id.to_string();

    state.tx_ingest.send(job)?;
    tracing::debug!(job_id, "content body enqueued");

    Ok((StatusCode::ACCEPTED, Json(IngestAccepted { job_id })))
}

/// Runs one computation cycle immediately. This is the external re-trigger
/// for a failed scheduled cycle; it shares the scheduler's computer, not a
/// second pipeline.
#[instrument(skip(state))]
pub async fn run_trending_cycle(
    State(state): State<Arc<AppState>>,
) -> JsonResult<TrendingSnapshot> {
    let snapshot = state.computer.run().await?;
    Ok(Json(snapshot))
}
