//! Authentication and authorization middleware.
//!
//! Every request passes through [`auth_gate`] before reaching a handler:
//! the route is classified, content routes are rate-limited and offered a
//! content-token grant, and everything except the public routes ends in one
//! mandatory session verification. That final check is the only place a 401
//! is decided.

use crate::capability;
use crate::error::{ApiError, ApiResult};
use crate::ratelimit;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::http::header::COOKIE;
use axum::middleware::Next;
use axum::response::Response;
use gangway_core::credential::IdentityCredential;
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "gangway.sid";

/// Maximum length for client-provided trace IDs.
/// Longer values are truncated to prevent log bloat and log injection.
const MAX_TRACE_ID_LEN: usize = 128;

/// Trace ID for request correlation.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    /// Generate a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create a trace ID from a client-provided value, truncated and
    /// filtered to printable ASCII for log safety.
    pub fn from_client(value: &str) -> Self {
        let sanitized: String = value
            .chars()
            .take(MAX_TRACE_ID_LEN)
            .filter(|c| c.is_ascii_graphic() || *c == ' ')
            .collect();

        if sanitized.is_empty() {
            Self::new()
        } else {
            Self(sanitized)
        }
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Authenticated request extension.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    /// The verified identity.
    pub credential: IdentityCredential,
}

/// Static per-route authorization policy. Fixed at startup; derived from the
/// route shape alone, never from request state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteClass {
    /// No authorization applies (credential issuance).
    Public,
    /// Resource-fetch route reachable through a content token; rate-limited.
    ContentBypassEligible {
        /// Torrent identifier from the path.
        hash: String,
        /// Content selection from the path.
        indices: String,
    },
    /// Session credential required (the default).
    Protected,
}

impl RouteClass {
    /// Classify a request by method and path.
    pub fn classify(method: &Method, path: &str) -> Self {
        if method == Method::POST && path == "/auth/authenticate" {
            return Self::Public;
        }

        if method == Method::GET {
            let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
            if let ["torrents", hash, "contents", indices, leaf] = segments.as_slice()
                && matches!(*leaf, "data" | "subtitles")
                && !hash.is_empty()
                && !indices.is_empty()
            {
                return Self::ContentBypassEligible {
                    hash: (*hash).to_string(),
                    indices: (*indices).to_string(),
                };
            }
        }

        Self::Protected
    }
}

#[derive(Deserialize)]
struct ContentTokenQuery {
    token: Option<String>,
}

/// Extract the session token from the Cookie header(s).
fn extract_session_cookie(req: &Request) -> Option<String> {
    req.headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Extract the content token from the query string, if any.
fn extract_content_token(req: &Request) -> Option<String> {
    axum::extract::Query::<ContentTokenQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|query| query.0.token)
}

/// Extract trace ID from X-Trace-Id header or generate a new one.
fn extract_or_generate_trace_id(req: &Request) -> TraceId {
    req.headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(TraceId::from_client)
        .unwrap_or_else(TraceId::new)
}

/// The single mandatory verification step.
///
/// Whatever channel produced the candidate token (session cookie or a
/// content-token grant), it is verified here, against the same secret and
/// the same expiry policy. Absence and every verification failure collapse
/// into one opaque 401.
fn verify_candidate(state: &AppState, candidate: Option<String>) -> ApiResult<AuthenticatedUser> {
    let token = candidate
        .ok_or_else(|| ApiError::Unauthenticated("missing or invalid session credential".into()))?;
    let credential = state
        .signer
        .verify(&token)
        .map_err(|_| ApiError::Unauthenticated("missing or invalid session credential".into()))?;
    Ok(AuthenticatedUser { credential })
}

/// Authorization middleware applied to the whole router.
pub async fn auth_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let trace_id = extract_or_generate_trace_id(&req);
    let trace_id_str = trace_id.0.clone();
    req.extensions_mut().insert(trace_id);

    match RouteClass::classify(req.method(), req.uri().path()) {
        RouteClass::Public => {}
        RouteClass::ContentBypassEligible { hash, indices } => {
            // The budget check precedes any credential evaluation.
            let key = ratelimit::extract_client_key(&req, &state.rate_limit);
            state.rate_limit.check(&key).map_err(|e| {
                tracing::debug!(key = %key, "content route rejected by rate limiter");
                ApiError::RateLimited {
                    retry_after_secs: e.retry_after_secs,
                }
            })?;

            // A usable content token stands in for the session cookie; an
            // unusable one is treated as absent and the cookie is consulted.
            let token = extract_content_token(&req);
            let granted =
                capability::try_grant(&state.signer, &hash, &indices, token.as_deref());
            let candidate = granted.or_else(|| extract_session_cookie(&req));

            let user = verify_candidate(&state, candidate)?;
            req.extensions_mut().insert(user);
        }
        RouteClass::Protected => {
            let user = verify_candidate(&state, extract_session_cookie(&req))?;
            req.extensions_mut().insert(user);
        }
    }

    let response = next
        .run(req)
        .instrument(tracing::info_span!("request", trace_id = %trace_id_str))
        .await;

    Ok(response)
}

/// Require authentication (the gate must have attached an identity).
pub fn require_auth(req: &Request) -> ApiResult<&AuthenticatedUser> {
    req.extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::Unauthenticated("authentication required".to_string()))
}

/// Build the Set-Cookie value carrying a session credential.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_secs}")
}

/// Build the Set-Cookie value that clears the session.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn login_route_is_public() {
        assert_eq!(
            RouteClass::classify(&Method::POST, "/auth/authenticate"),
            RouteClass::Public
        );
        // Only the POST form is public.
        assert_eq!(
            RouteClass::classify(&Method::GET, "/auth/authenticate"),
            RouteClass::Protected
        );
    }

    #[test]
    fn content_routes_capture_their_scope() {
        let class = RouteClass::classify(&Method::GET, "/torrents/abc/contents/0-1/data");
        assert_eq!(
            class,
            RouteClass::ContentBypassEligible {
                hash: "abc".to_string(),
                indices: "0-1".to_string(),
            }
        );

        let class = RouteClass::classify(&Method::GET, "/torrents/abc/contents/2,4/subtitles");
        assert_eq!(
            class,
            RouteClass::ContentBypassEligible {
                hash: "abc".to_string(),
                indices: "2,4".to_string(),
            }
        );
    }

    #[test]
    fn near_miss_content_routes_stay_protected() {
        for path in [
            "/torrents/abc/contents/0-1/token",
            "/torrents/abc/contents/0-1",
            "/torrents/abc/contents/0-1/data/extra",
            "/torrents//contents/0-1/data",
            "/torrents/abc/contents//data",
        ] {
            assert_eq!(
                RouteClass::classify(&Method::GET, path),
                RouteClass::Protected,
                "path: {path}"
            );
        }
        // Method matters too.
        assert_eq!(
            RouteClass::classify(&Method::POST, "/torrents/abc/contents/0-1/data"),
            RouteClass::Protected
        );
    }

    #[test]
    fn unknown_routes_default_to_protected() {
        assert_eq!(
            RouteClass::classify(&Method::GET, "/does/not/exist"),
            RouteClass::Protected
        );
    }

    #[test]
    fn session_cookie_is_parsed_from_header() {
        let req = axum::http::Request::builder()
            .uri("/history")
            .header(COOKIE, "other=1; gangway.sid=tok-123; theme=dark")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_session_cookie(&req), Some("tok-123".to_string()));
    }

    #[test]
    fn missing_session_cookie_is_none() {
        let req = axum::http::Request::builder()
            .uri("/history")
            .header(COOKIE, "other=1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_session_cookie(&req), None);
    }

    #[test]
    fn content_token_is_parsed_from_query() {
        let req = axum::http::Request::builder()
            .uri("/torrents/abc/contents/0-1/data?token=tok-456")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_content_token(&req), Some("tok-456".to_string()));

        let req = axum::http::Request::builder()
            .uri("/torrents/abc/contents/0-1/data")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_content_token(&req), None);
    }

    #[test]
    fn trace_id_sanitizes_client_values() {
        let id = TraceId::from_client("abc-123");
        assert_eq!(id.0, "abc-123");

        let id = TraceId::from_client("evil\nvalue\x07");
        assert_eq!(id.0, "evilvalue");

        // All-garbage input falls back to a generated ID.
        let id = TraceId::from_client("\n\r\x00");
        assert!(!id.0.is_empty());
    }

    #[test]
    fn cookie_helpers_scope_to_root_path() {
        let set = session_cookie("tok", 3600);
        assert!(set.starts_with("gangway.sid=tok;"));
        assert!(set.contains("HttpOnly"));
        assert!(set.contains("Max-Age=3600"));

        let clear = clear_session_cookie();
        assert!(clear.contains("Max-Age=0"));
    }
}
