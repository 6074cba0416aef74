//! Content-fetch endpoints for torrent files.
//!
//! These are the routes reachable through content tokens. By the time a
//! handler runs, the gate has already rate-limited the request and resolved
//! an identity, through either the token grant or the session cookie.

use crate::auth::require_auth;
use crate::capability;
use crate::error::{ApiError, ApiResult};
use crate::services::TorrentContent;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::collections::BTreeSet;
use time::OffsetDateTime;

/// Response carrying a freshly minted content token.
#[derive(Debug, Serialize)]
pub struct ContentTokenResponse {
    pub token: String,
}

/// Parse a content selection: a single index, a range, or a comma list
/// (e.g. `"3"`, `"0-2"`, `"1,4,7"`).
fn parse_indices(indices: &str) -> ApiResult<BTreeSet<usize>> {
    let mut selection = BTreeSet::new();

    for part in indices.split(',') {
        if let Some((lo, hi)) = part.split_once('-') {
            let lo: usize = lo
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid content selection: {indices}")))?;
            let hi: usize = hi
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid content selection: {indices}")))?;
            if lo > hi {
                return Err(ApiError::BadRequest(format!(
                    "invalid content selection: {indices}"
                )));
            }
            selection.extend(lo..=hi);
        } else {
            let index: usize = part
                .parse()
                .map_err(|_| ApiError::BadRequest(format!("invalid content selection: {indices}")))?;
            selection.insert(index);
        }
    }

    Ok(selection)
}

/// Resolve a selection to exactly one content file.
async fn select_single_content(
    state: &AppState,
    hash: &str,
    indices: &str,
) -> ApiResult<TorrentContent> {
    let contents = state.client_gateway.get_torrent_contents(hash).await?;
    let selection = parse_indices(indices)?;

    let mut selected: Vec<TorrentContent> = contents
        .into_iter()
        .filter(|content| selection.contains(&content.index))
        .collect();

    match selected.len() {
        0 => Err(ApiError::FileNotFound(format!(
            "selection {indices} matches no content of torrent {hash}"
        ))),
        1 => Ok(selected.remove(0)),
        // Packaging several files into one download is an archive concern of
        // the client adapter layer, which this service does not own.
        _ => Err(ApiError::BadRequest(
            "selection must resolve to a single file".to_string(),
        )),
    }
}

async fn read_content_file(path: &std::path::Path) -> ApiResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::FileNotFound(format!("content file missing: {}", path.display()))
        } else {
            ApiError::Internal(format!("failed to read {}: {e}", path.display()))
        }
    })
}

/// GET /torrents/{hash}/contents/{indices}/data - Serve a content file.
pub async fn content_data(
    State(state): State<AppState>,
    Path((hash, indices)): Path<(String, String)>,
) -> ApiResult<Response> {
    let content = select_single_content(&state, &hash, &indices).await?;
    let bytes = read_content_file(&content.path).await?;

    let filename = content
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    Ok((
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET /torrents/{hash}/contents/{indices}/subtitles - Serve the subtitle
/// sidecar of a content file.
pub async fn content_subtitles(
    State(state): State<AppState>,
    Path((hash, indices)): Path<(String, String)>,
) -> ApiResult<Response> {
    let content = select_single_content(&state, &hash, &indices).await?;

    for (extension, content_type) in [("vtt", "text/vtt"), ("srt", "application/x-subrip")] {
        let sidecar = content.path.with_extension(extension);
        match tokio::fs::read(&sidecar).await {
            Ok(bytes) => {
                return Ok(([(CONTENT_TYPE, content_type)], bytes).into_response());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(ApiError::Internal(format!(
                    "failed to read {}: {e}",
                    sidecar.display()
                )));
            }
        }
    }

    Err(ApiError::FileNotFound(format!(
        "no subtitles for selection {indices} of torrent {hash}"
    )))
}

/// GET /torrents/{hash}/contents/{indices}/token - Mint a content token
/// scoped to exactly this resource for the authenticated user.
pub async fn mint_content_token(
    State(state): State<AppState>,
    Path((hash, indices)): Path<(String, String)>,
    req: Request,
) -> ApiResult<Json<ContentTokenResponse>> {
    let user = require_auth(&req)?;

    let token = capability::mint(
        &state.signer,
        &user.credential.username,
        &hash,
        &indices,
        OffsetDateTime::now_utc(),
    )?;

    Ok(Json(ContentTokenResponse { token }))
}
