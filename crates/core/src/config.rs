//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable request tracing.
    #[serde(default)]
    pub enable_tracing: bool,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            enable_tracing: false,
        }
    }
}

/// Authentication configuration.
///
/// gangway serves a single account. The password is never stored; only its
/// SHA-256 hash appears in configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Account username.
    pub username: String,
    /// Pre-computed hash of the account password (SHA256 hex, 64 characters).
    /// Generate with: `echo -n "your-password" | sha256sum`
    pub password_hash: String,
    /// Session credential time-to-live in seconds.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Signing secret source.
    #[serde(default)]
    pub secret: SecretConfig,
}

fn default_session_ttl_secs() -> u64 {
    crate::DEFAULT_SESSION_TTL_SECS
}

impl AuthConfig {
    /// Create a test configuration with a dummy password hash.
    ///
    /// **For testing only.** The password is "test-password".
    pub fn for_testing() -> Self {
        Self {
            username: "admin".to_string(),
            // SHA256 of "test-password"
            password_hash: "c638833f69bbfb3c267afa0a74434812436b8f08a81fd263c6be6871de4f1265"
                .to_string(),
            session_ttl_secs: default_session_ttl_secs(),
            secret: SecretConfig::Generate,
        }
    }

    /// Validate authentication configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.username.is_empty() {
            return Err("auth.username must not be empty".to_string());
        }
        let hash = self
            .password_hash
            .strip_prefix("sha256:")
            .unwrap_or(&self.password_hash);
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("invalid auth.password_hash: expected 64 hex chars".to_string());
        }
        if self.session_ttl_secs == 0 {
            return Err("auth.session_ttl_secs cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Signing secret source configuration.
///
/// The secret is loaded once at process start and is immutable for the
/// process lifetime. Changing it invalidates all outstanding credentials.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SecretConfig {
    /// Secret stored in a file.
    File {
        /// Path to the secret file (base64).
        path: PathBuf,
    },
    /// Secret stored in an environment variable.
    Env {
        /// Environment variable name.
        var: String,
    },
    /// Secret provided directly as a value (NOT recommended for production).
    Value {
        /// The secret, base64-encoded.
        secret: String,
    },
    /// Generate a new secret at startup. Every restart logs out all
    /// sessions; suitable for development only.
    #[default]
    Generate,
}

/// Content-route rate limiting configuration.
///
/// A fixed window per client key: once `max_requests` requests have been
/// counted inside a window, further requests are rejected until the window
/// elapses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting on content routes.
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
    /// Requests allowed per window per client key.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Trusted proxy IP addresses/CIDR ranges.
    /// Only requests from these IPs will have X-Forwarded-For/X-Real-IP
    /// headers trusted. If empty, forwarded headers are never trusted.
    /// Use ["*"] to trust all proxies (NOT recommended for production).
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    /// Maximum number of unique client keys to track before rejecting new
    /// ones (default: 100000). Prevents memory exhaustion from attackers
    /// spraying unique IPs.
    #[serde(default = "default_max_entries")]
    pub max_entries: u32,
    /// Interval in seconds between cleanup sweeps of stale windows.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Time-to-live in seconds for idle counters. Should be at least the
    /// window length, or limits reset early under cleanup.
    #[serde(default = "default_entry_ttl_secs")]
    pub entry_ttl_secs: u64,
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_max_requests() -> u32 {
    crate::DEFAULT_CONTENT_MAX_REQUESTS
}

fn default_window_secs() -> u64 {
    crate::DEFAULT_CONTENT_WINDOW_SECS
}

fn default_max_entries() -> u32 {
    100_000
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_entry_ttl_secs() -> u64 {
    600
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_rate_limit_enabled(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            trusted_proxies: Vec::new(),
            max_entries: default_max_entries(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            entry_ttl_secs: default_entry_ttl_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Validate rate limit configuration.
    /// Returns warnings for configs that are insecure but allowed,
    /// and errors for configs that are unsafe and should be rejected.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();

        if !self.enabled {
            return Ok(warnings);
        }

        if self.max_requests == 0 {
            return Err("rate_limit.max_requests cannot be 0".to_string());
        }
        if self.window_secs == 0 {
            return Err("rate_limit.window_secs cannot be 0".to_string());
        }
        if self.cleanup_interval_secs == 0 {
            return Err("rate_limit.cleanup_interval_secs cannot be 0. \
                 This would cause a panic when creating the cleanup timer."
                .to_string());
        }

        if self.trusted_proxies.len() == 1 && self.trusted_proxies[0] == "*" {
            warnings.push(
                "rate_limit.trusted_proxies=['*'] trusts ALL forwarded headers. \
                 This allows clients to spoof their IP address and bypass rate limits."
                    .to_string(),
            );
        }

        if self.entry_ttl_secs < self.window_secs {
            warnings.push(format!(
                "rate_limit.entry_ttl_secs={} is shorter than the {}s window; \
                 counters may be evicted mid-window, resetting limits early.",
                self.entry_ttl_secs, self.window_secs
            ));
        }

        Ok(warnings)
    }
}

/// Filesystem browsing configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DirectoriesConfig {
    /// Directories under which browsing is permitted. Paths resolving
    /// outside every entry are rejected.
    #[serde(default)]
    pub allow_list: Vec<PathBuf>,
}

impl DirectoriesConfig {
    /// Validate directory configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.allow_list.is_empty() {
            return Err(
                "directories.allow_list must not be empty; \
                 list at least one directory to expose for browsing"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication configuration (required).
    pub auth: AuthConfig,
    /// Content-route rate limiting configuration.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Filesystem browsing configuration.
    #[serde(default)]
    pub directories: DirectoriesConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses a generated secret, a dummy password hash,
    /// and the system temp directory as the browse allow-list.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::for_testing(),
            rate_limit: RateLimitConfig::default(),
            directories: DirectoriesConfig {
                allow_list: vec![std::env::temp_dir()],
            },
        }
    }

    /// Validate the whole configuration.
    /// Returns warnings for risky settings and errors for invalid ones.
    pub fn validate(&self) -> Result<Vec<String>, String> {
        self.auth.validate()?;
        self.directories.validate()?;
        self.rate_limit.validate()
    }
}
