//! Session authentication endpoints.

use crate::auth::{clear_session_cookie, require_auth, session_cookie};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse, Response};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    pub username: String,
    pub password: String,
}

/// Response for a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateResponse {
    pub username: String,
    pub expires_at: i64,
}

/// Response for the authenticated caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub username: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

/// Constant-time equality over the two hash strings.
fn hashes_match(expected: &str, actual: &str) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    expected
        .bytes()
        .zip(actual.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// POST /auth/authenticate - Issue a session credential as a cookie.
///
/// The only public route: everything else requires the credential this
/// endpoint hands out.
pub async fn authenticate(
    State(state): State<AppState>,
    Json(body): Json<AuthenticateRequest>,
) -> ApiResult<Response> {
    let auth = &state.config.auth;

    let expected = auth
        .password_hash
        .strip_prefix("sha256:")
        .unwrap_or(&auth.password_hash)
        .to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(body.password.as_bytes());
    let actual: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();

    // Evaluate both comparisons so a username miss costs the same as a
    // password miss.
    let username_ok = body.username == auth.username;
    let password_ok = hashes_match(&expected, &actual);
    if !username_ok || !password_ok {
        return Err(ApiError::Unauthenticated(
            "incorrect username or password".to_string(),
        ));
    }

    let now = OffsetDateTime::now_utc();
    let token = state.signer.sign(&auth.username, now)?;
    let max_age = state.signer.ttl().whole_seconds();

    tracing::info!(username = %auth.username, "session credential issued");

    let headers = AppendHeaders([(SET_COOKIE, session_cookie(&token, max_age))]);
    let body = AuthenticateResponse {
        username: auth.username.clone(),
        expires_at: state.signer.expiry_for(now.unix_timestamp()),
    };
    Ok((headers, Json(body)).into_response())
}

/// GET /auth/verify - Return the resolved identity for the session.
pub async fn verify(req: Request) -> ApiResult<Json<VerifyResponse>> {
    let user = require_auth(&req)?;
    let credential = &user.credential;

    Ok(Json(VerifyResponse {
        username: credential.username.clone(),
        issued_at: credential.issued_at,
        expires_at: credential.expires_at,
    }))
}

/// POST /auth/logout - Clear the session cookie.
pub async fn logout(req: Request) -> ApiResult<Response> {
    let user = require_auth(&req)?;
    tracing::info!(username = %user.credential.username, "session ended");

    let headers = AppendHeaders([(SET_COOKIE, clear_session_cookie())]);
    Ok((headers, Json(serde_json::json!({ "success": true }))).into_response())
}
