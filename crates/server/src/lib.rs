//! HTTP API server for the gangway torrent-management boundary.
//!
//! This crate provides the HTTP control plane:
//! - Session authentication via a signed cookie credential
//! - Scope-exact content tokens for direct download links
//! - Allow-list guarded filesystem browsing
//! - Fixed-window rate limiting on content routes
//! - History, notification, and settings endpoints

pub mod auth;
pub mod capability;
pub mod error;
pub mod handlers;
pub mod pathguard;
pub mod ratelimit;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{AuthenticatedUser, TraceId};
pub use error::ApiError;
pub use pathguard::PathGuard;
pub use ratelimit::RateLimitState;
pub use routes::create_router;
pub use state::AppState;
