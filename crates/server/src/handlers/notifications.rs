//! Notification endpoints.

use crate::error::ApiResult;
use crate::services::{NotificationFetch, NotificationQuery};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};

/// GET /notifications - Fetch stored notifications, newest first.
pub async fn get_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<NotificationFetch>> {
    let fetch = state.notifications.get_notifications(query).await?;
    Ok(Json(fetch))
}

/// DELETE /notifications - Clear all stored notifications.
pub async fn clear_notifications(
    State(state): State<AppState>,
) -> ApiResult<Json<serde_json::Value>> {
    state.notifications.clear_notifications().await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
