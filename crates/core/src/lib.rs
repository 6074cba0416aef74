//! Core domain types for the gangway management API.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Identity credentials and content-token claims
//! - Application configuration
//! - Shared error types

pub mod config;
pub mod credential;
pub mod error;

pub use config::AppConfig;
pub use credential::{ContentTokenClaims, IdentityCredential};
pub use error::{Error, Result};

/// Default session credential time-to-live: 30 days.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Default content-route budget: 100 requests per window.
pub const DEFAULT_CONTENT_MAX_REQUESTS: u32 = 100;

/// Default content-route rate-limit window: 5 minutes.
pub const DEFAULT_CONTENT_WINDOW_SECS: u64 = 300;
