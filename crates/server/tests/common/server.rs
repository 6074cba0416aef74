//! Server test utilities.

use gangway_core::config::AppConfig;
use gangway_server::services::memory::{
    MemoryClientGateway, MemoryHistoryService, MemoryNotificationService, MemorySettingService,
};
use gangway_server::services::TorrentContent;
use gangway_server::{AppState, create_router};
use gangway_signer::{CredentialSigner, Secret};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub history: Arc<MemoryHistoryService>,
    pub notifications: Arc<MemoryNotificationService>,
    pub gateway: Arc<MemoryClientGateway>,
    temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with a temp-dir browse root.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut config = AppConfig::for_testing();
        config.directories.allow_list = vec![temp_dir.path().to_path_buf()];
        modifier(&mut config);

        let ttl = time::Duration::seconds(config.auth.session_ttl_secs as i64);
        let signer = CredentialSigner::new(Secret::generate(), ttl);

        let history = Arc::new(MemoryHistoryService::new());
        let notifications = Arc::new(MemoryNotificationService::new());
        let settings = Arc::new(MemorySettingService::default());
        let gateway = Arc::new(MemoryClientGateway::new());

        let state = AppState::new(
            config,
            signer,
            history.clone(),
            notifications.clone(),
            settings,
            gateway.clone(),
        );

        let router = create_router(state.clone());

        Self {
            router,
            state,
            history,
            notifications,
            gateway,
            temp_dir,
        }
    }

    /// The directory covered by the browse allow-list.
    pub fn browse_root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Log in with the test credentials, returning the session cookie pair.
    pub async fn login_cookie(&self) -> String {
        let response = super::raw_request(
            &self.router,
            "POST",
            "/auth/authenticate",
            Some(serde_json::json!({
                "username": "admin",
                "password": "test-password",
            })),
            None,
        )
        .await;

        assert!(
            response.status().is_success(),
            "login failed: {}",
            response.status()
        );
        super::cookie_pair(&response).expect("login response carried no Set-Cookie")
    }

    /// Register a single-file torrent backed by a real file on disk.
    /// Returns the path of the created file.
    pub async fn seed_torrent_file(
        &self,
        hash: &str,
        index: usize,
        name: &str,
        bytes: &[u8],
    ) -> std::path::PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, bytes).expect("Failed to write torrent content file");

        self.gateway
            .add_torrent(
                hash,
                vec![TorrentContent {
                    index,
                    path: path.clone(),
                }],
            )
            .await;
        path
    }
}
