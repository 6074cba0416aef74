//! In-memory collaborator implementations.
//!
//! Back the default single-process deployment and the test suite. State does
//! not survive a restart.

use super::{
    ClientGatewayService, HistoryService, HistorySnapshot, Notification, NotificationFetch,
    NotificationQuery, NotificationService, ServiceError, ServiceResult, SettingService,
    SnapshotPeriod, TorrentContent,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory transfer-history store.
#[derive(Default)]
pub struct MemoryHistoryService {
    snapshots: RwLock<HashMap<SnapshotPeriod, HistorySnapshot>>,
}

impl MemoryHistoryService {
    /// Create an empty history store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample to a period's snapshot.
    pub async fn record(&self, period: SnapshotPeriod, ts: i64, download: u64, upload: u64) {
        let mut snapshots = self.snapshots.write().await;
        let snapshot = snapshots.entry(period).or_default();
        snapshot.timestamps.push(ts);
        snapshot.download.push(download);
        snapshot.upload.push(upload);
    }
}

#[async_trait]
impl HistoryService for MemoryHistoryService {
    async fn get_history(&self, period: SnapshotPeriod) -> ServiceResult<HistorySnapshot> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(&period).cloned().unwrap_or_default())
    }
}

/// In-memory notification store, newest first.
#[derive(Default)]
pub struct MemoryNotificationService {
    notifications: RwLock<Vec<Notification>>,
}

impl MemoryNotificationService {
    /// Create an empty notification store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new notification.
    pub async fn add(&self, kind: &str, ts: i64, data: serde_json::Value) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            ts,
            read: false,
            kind: kind.to_string(),
            data,
        };
        let mut notifications = self.notifications.write().await;
        notifications.insert(0, notification.clone());
        notification
    }
}

#[async_trait]
impl NotificationService for MemoryNotificationService {
    async fn get_notifications(&self, query: NotificationQuery) -> ServiceResult<NotificationFetch> {
        let notifications = self.notifications.read().await;

        let total = notifications.len();
        let unread = notifications.iter().filter(|n| !n.read).count();

        let start = query.start.unwrap_or(0).min(total);
        let end = match query.limit {
            Some(limit) => start.saturating_add(limit).min(total),
            None => total,
        };

        Ok(NotificationFetch {
            notifications: notifications[start..end].to_vec(),
            total,
            unread,
        })
    }

    async fn clear_notifications(&self) -> ServiceResult<()> {
        self.notifications.write().await.clear();
        Ok(())
    }
}

/// In-memory settings store.
pub struct MemorySettingService {
    settings: RwLock<serde_json::Map<String, serde_json::Value>>,
}

impl MemorySettingService {
    /// Create a settings store seeded with defaults.
    pub fn new(defaults: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            settings: RwLock::new(defaults),
        }
    }
}

impl Default for MemorySettingService {
    fn default() -> Self {
        Self::new(serde_json::Map::new())
    }
}

#[async_trait]
impl SettingService for MemorySettingService {
    async fn get(&self, property: Option<&str>) -> ServiceResult<serde_json::Value> {
        let settings = self.settings.read().await;
        match property {
            None => Ok(serde_json::Value::Object(settings.clone())),
            Some(name) => settings
                .get(name)
                .cloned()
                .ok_or_else(|| ServiceError::NotFound(format!("no setting named '{name}'"))),
        }
    }

    async fn set(
        &self,
        partial: serde_json::Map<String, serde_json::Value>,
    ) -> ServiceResult<serde_json::Value> {
        let mut settings = self.settings.write().await;
        for (key, value) in partial {
            settings.insert(key, value);
        }
        Ok(serde_json::Value::Object(settings.clone()))
    }
}

/// In-memory torrent-client gateway.
#[derive(Default)]
pub struct MemoryClientGateway {
    torrents: RwLock<HashMap<String, Vec<TorrentContent>>>,
}

impl MemoryClientGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the content files of a torrent.
    pub async fn add_torrent(&self, hash: &str, contents: Vec<TorrentContent>) {
        self.torrents.write().await.insert(hash.to_string(), contents);
    }
}

#[async_trait]
impl ClientGatewayService for MemoryClientGateway {
    async fn get_torrent_contents(&self, hash: &str) -> ServiceResult<Vec<TorrentContent>> {
        let torrents = self.torrents.read().await;
        torrents
            .get(hash)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("no torrent with hash '{hash}'")))
    }
}
