//! Transfer-history endpoint.

use crate::error::ApiResult;
use crate::services::{HistorySnapshot, SnapshotPeriod};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

/// Query parameters for a history fetch.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Sampling period; defaults to the five-minute snapshot.
    pub snapshot: Option<SnapshotPeriod>,
}

/// GET /history - Return the transfer-rate snapshot for a period.
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistorySnapshot>> {
    let period = query.snapshot.unwrap_or(SnapshotPeriod::FiveMinute);
    let snapshot = state.history.get_history(period).await?;
    Ok(Json(snapshot))
}
