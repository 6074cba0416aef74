//! Filesystem browsing endpoint.

use crate::error::{ApiError, ApiResult};
use crate::pathguard;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

/// Query parameters for a directory listing.
#[derive(Debug, Deserialize)]
pub struct DirectoryListQuery {
    pub path: Option<String>,
}

/// Directory listing response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListResponse {
    /// Names of child directories, sorted.
    pub directories: Vec<String>,
    /// Names of child files, sorted.
    pub files: Vec<String>,
    /// Display hint: whether the path looks like it has a browsable parent.
    /// A path-shape heuristic, not a filesystem truth.
    pub has_parent: bool,
    /// The resolved absolute path that was listed.
    pub path: String,
    /// Platform path separator, for client-side path assembly.
    pub separator: String,
}

/// GET /directory-list - List the immediate children of an allowed path.
///
/// Both failure conditions are decided before any filesystem access: a
/// missing or empty `path` is a 404, and a path resolving outside every
/// allow-list root is a 403.
pub async fn directory_list(
    State(state): State<AppState>,
    Query(query): Query<DirectoryListQuery>,
) -> ApiResult<Json<DirectoryListResponse>> {
    let raw = match query.path.as_deref() {
        Some(path) if !path.is_empty() => path,
        _ => {
            return Err(ApiError::FileNotFound("no path provided".to_string()));
        }
    };

    let resolved = pathguard::sanitize(raw);
    if !state.pathguard.is_allowed(&resolved) {
        return Err(ApiError::AccessDenied(format!(
            "path is outside the configured directories: {}",
            resolved.display()
        )));
    }

    let contents = state.pathguard.list(resolved.clone()).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::FileNotFound(format!("no such directory: {}", resolved.display()))
        } else {
            ApiError::Internal(format!("failed to list {}: {e}", resolved.display()))
        }
    })?;

    Ok(Json(DirectoryListResponse {
        directories: contents.directories,
        files: contents.files,
        has_parent: pathguard::has_parent(&resolved),
        path: resolved.to_string_lossy().into_owned(),
        separator: std::path::MAIN_SEPARATOR.to_string(),
    }))
}
