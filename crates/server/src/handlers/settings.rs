//! Settings endpoints.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};

/// GET /settings - Fetch all settings.
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let settings = state.settings.get(None).await?;
    Ok(Json(settings))
}

/// GET /settings/{property} - Fetch a single settings property.
pub async fn get_setting_property(
    State(state): State<AppState>,
    Path(property): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let value = state.settings.get(Some(&property)).await?;
    Ok(Json(value))
}

/// PATCH /settings - Merge a partial settings object, returning the saved
/// settings.
pub async fn patch_settings(
    State(state): State<AppState>,
    Json(partial): Json<serde_json::Map<String, serde_json::Value>>,
) -> ApiResult<Json<serde_json::Value>> {
    let saved = state.settings.set(partial).await?;
    Ok(Json(saved))
}
