//! Application state shared across handlers.

use crate::pathguard::PathGuard;
use crate::ratelimit::RateLimitState;
use crate::services::{ClientGatewayService, HistoryService, NotificationService, SettingService};
use gangway_core::config::AppConfig;
use gangway_signer::CredentialSigner;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
///
/// Collaborator services are required dependencies: constructing the state
/// without one is impossible, so a missing service is a startup
/// configuration error rather than a silent per-request no-op.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration, immutable for the process lifetime.
    pub config: Arc<AppConfig>,
    /// Credential signer over the process-wide secret.
    pub signer: Arc<CredentialSigner>,
    /// Content-route rate limiting state.
    pub rate_limit: RateLimitState,
    /// Filesystem containment guard.
    pub pathguard: Arc<PathGuard>,
    /// Transfer-history collaborator.
    pub history: Arc<dyn HistoryService>,
    /// Notification collaborator.
    pub notifications: Arc<dyn NotificationService>,
    /// Settings collaborator.
    pub settings: Arc<dyn SettingService>,
    /// Torrent-client gateway collaborator.
    pub client_gateway: Arc<dyn ClientGatewayService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Validates the configuration, logging warnings for risky settings.
    ///
    /// # Panics
    ///
    /// Panics if configuration validation fails with an error.
    pub fn new(
        config: AppConfig,
        signer: CredentialSigner,
        history: Arc<dyn HistoryService>,
        notifications: Arc<dyn NotificationService>,
        settings: Arc<dyn SettingService>,
        client_gateway: Arc<dyn ClientGatewayService>,
    ) -> Self {
        match config.validate() {
            Ok(warnings) => {
                for warning in warnings {
                    tracing::warn!("Configuration warning: {}", warning);
                }
            }
            Err(error) => {
                panic!("Invalid configuration: {}", error);
            }
        }

        let rate_limit = RateLimitState::new(&config.rate_limit);
        let pathguard = Arc::new(PathGuard::new(&config.directories.allow_list));

        Self {
            config: Arc::new(config),
            signer: Arc::new(signer),
            rate_limit,
            pathguard,
            history,
            notifications,
            settings,
            client_gateway,
        }
    }

    /// Get the cleanup interval for the rate limiter, if enabled.
    pub fn rate_limit_cleanup_interval(&self) -> Option<Duration> {
        if self.rate_limit.is_enabled() {
            Some(Duration::from_secs(self.config.rate_limit.cleanup_interval_secs))
        } else {
            None
        }
    }
}
