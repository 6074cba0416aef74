//! Gangway server binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use gangway_core::config::{AppConfig, SecretConfig};
use gangway_server::services::memory::{
    MemoryClientGateway, MemoryHistoryService, MemoryNotificationService, MemorySettingService,
};
use gangway_server::{AppState, create_router};
use gangway_signer::{CredentialSigner, Secret};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Gangway - authorization boundary for a torrent-management API
#[derive(Parser, Debug)]
#[command(name = "gangwayd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "GANGWAY_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Gangway v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override everything)
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    // Check for GANGWAY_ environment variables (excluding GANGWAY_CONFIG which is just the path)
    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("GANGWAY_") && key != "GANGWAY_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: gangwayd --config /path/to/config.toml\n  \
             2. Environment variables: GANGWAY_SERVER__BIND=0.0.0.0:3000 \
             GANGWAY_AUTH__USERNAME=admin GANGWAY_AUTH__PASSWORD_HASH=YOUR_HASH gangwayd\n\n\
             See config/server.example.toml for example configuration.\n\
             Set GANGWAY_CONFIG env var to specify a default config file path."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("GANGWAY_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Load the signing secret; it is immutable for the process lifetime.
    let secret = load_secret(&config.auth.secret).await?;
    let ttl = time::Duration::seconds(
        i64::try_from(config.auth.session_ttl_secs).unwrap_or(i64::MAX),
    );
    let signer = CredentialSigner::new(secret, ttl);

    // Collaborator services. Handlers require these at construction, so a
    // deployment without them fails here rather than no-oping per request.
    let history = Arc::new(MemoryHistoryService::new());
    let notifications = Arc::new(MemoryNotificationService::new());
    let settings = Arc::new(MemorySettingService::default());
    let client_gateway = Arc::new(MemoryClientGateway::new());
    tracing::info!("Collaborator services initialized");

    // Create application state
    let state = AppState::new(
        config.clone(),
        signer,
        history,
        notifications,
        settings,
        client_gateway,
    );

    // Spawn rate limiter cleanup task if rate limiting is enabled
    if let Some(cleanup_interval) = state.rate_limit_cleanup_interval() {
        let rate_limit_state = state.rate_limit.clone();
        gangway_server::ratelimit::spawn_cleanup_task(rate_limit_state, cleanup_interval);
        tracing::info!(
            interval_secs = cleanup_interval.as_secs(),
            "Rate limiter cleanup task spawned"
        );
    }

    // Create router
    let app = create_router(state);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    // Start server with ConnectInfo for client IP extraction
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load the signing secret from configuration.
async fn load_secret(config: &SecretConfig) -> Result<Secret> {
    match config {
        SecretConfig::File { path } => {
            let secret_data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read secret file: {}", path.display()))?;
            let secret = Secret::from_base64(secret_data.trim())
                .context("failed to parse signing secret")?;
            tracing::info!("Loaded signing secret from file");
            Ok(secret)
        }
        SecretConfig::Env { var } => {
            let secret_data = std::env::var(var)
                .with_context(|| format!("signing secret env var not set: {var}"))?;
            let secret = Secret::from_base64(secret_data.trim())
                .context("failed to parse signing secret")?;
            tracing::info!("Loaded signing secret from env: {}", var);
            Ok(secret)
        }
        SecretConfig::Value { secret } => {
            tracing::warn!("Using inline signing secret (not recommended for production)");
            let secret =
                Secret::from_base64(secret.trim()).context("failed to parse signing secret")?;
            Ok(secret)
        }
        SecretConfig::Generate => {
            tracing::warn!(
                "Generating ephemeral signing secret; all sessions are invalidated on restart"
            );
            Ok(Secret::generate())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn load_secret_from_file() {
        let secret = Secret::generate();
        let temp = tempdir().unwrap();
        let secret_path = temp.path().join("signing.secret");
        tokio::fs::write(&secret_path, secret.to_base64())
            .await
            .unwrap();

        let loaded = load_secret(&SecretConfig::File { path: secret_path })
            .await
            .unwrap();
        assert_eq!(loaded.to_base64(), secret.to_base64());
    }

    #[tokio::test]
    async fn load_secret_from_env() {
        let secret = Secret::generate();
        let prev = std::env::var("GANGWAY_TEST_SIGNING_SECRET").ok();
        // SAFETY: Tests run with --test-threads=1 so no concurrent access
        unsafe { std::env::set_var("GANGWAY_TEST_SIGNING_SECRET", secret.to_base64()) };

        let loaded = load_secret(&SecretConfig::Env {
            var: "GANGWAY_TEST_SIGNING_SECRET".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(loaded.to_base64(), secret.to_base64());

        // SAFETY: Tests run with --test-threads=1 so no concurrent access
        unsafe {
            if let Some(value) = prev {
                std::env::set_var("GANGWAY_TEST_SIGNING_SECRET", value);
            } else {
                std::env::remove_var("GANGWAY_TEST_SIGNING_SECRET");
            }
        }
    }

    #[tokio::test]
    async fn load_secret_from_value() {
        let secret = Secret::generate();
        let loaded = load_secret(&SecretConfig::Value {
            secret: secret.to_base64(),
        })
        .await
        .unwrap();
        assert_eq!(loaded.to_base64(), secret.to_base64());
    }

    #[tokio::test]
    async fn load_secret_generate() {
        let loaded = load_secret(&SecretConfig::Generate).await.unwrap();
        assert!(!loaded.to_base64().is_empty());
    }
}
