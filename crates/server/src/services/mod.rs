//! External collaborator interfaces.
//!
//! Transfer history, notifications, settings, and the torrent-client gateway
//! are consumed through these interfaces only. Handlers receive them as
//! required constructor-injected dependencies: a missing service is a
//! startup configuration error, never a per-request no-op.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by collaborator services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFoundError",
            Self::Unavailable(_) => "ServiceUnavailableError",
            Self::Internal(_) => "InternalError",
        }
    }
}

/// Result type for collaborator calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Sampling period of a transfer-history snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotPeriod {
    FiveMinute,
    ThirtyMinute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

/// A transfer-rate history snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    /// Sample timestamps, unix seconds.
    pub timestamps: Vec<i64>,
    /// Download rates in bytes/s, one per timestamp.
    pub download: Vec<u64>,
    /// Upload rates in bytes/s, one per timestamp.
    pub upload: Vec<u64>,
}

/// Transfer-history recording, consumed read-only by this service.
#[async_trait]
pub trait HistoryService: Send + Sync {
    /// Fetch the snapshot for a sampling period.
    async fn get_history(&self, period: SnapshotPeriod) -> ServiceResult<HistorySnapshot>;
}

/// A stored notification.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification identifier.
    pub id: String,
    /// Creation time, unix seconds.
    pub ts: i64,
    /// Whether the notification has been read.
    pub read: bool,
    /// Notification kind, e.g. "notification.torrent.finished".
    pub kind: String,
    /// Kind-specific payload.
    pub data: serde_json::Value,
}

/// Pagination options for a notification fetch.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct NotificationQuery {
    /// Offset into the newest-first notification list.
    pub start: Option<usize>,
    /// Maximum number of notifications to return.
    pub limit: Option<usize>,
}

/// Result of a notification fetch.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFetch {
    /// The selected notifications, newest first.
    pub notifications: Vec<Notification>,
    /// Total number of stored notifications.
    pub total: usize,
    /// Number of unread notifications.
    pub unread: usize,
}

/// Notification storage and aggregation.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Fetch notifications, newest first.
    async fn get_notifications(&self, query: NotificationQuery) -> ServiceResult<NotificationFetch>;

    /// Remove all stored notifications.
    async fn clear_notifications(&self) -> ServiceResult<()>;
}

/// Settings persistence.
#[async_trait]
pub trait SettingService: Send + Sync {
    /// Fetch all settings, or a single property when one is named.
    async fn get(&self, property: Option<&str>) -> ServiceResult<serde_json::Value>;

    /// Merge a partial settings object and return the saved settings.
    async fn set(
        &self,
        partial: serde_json::Map<String, serde_json::Value>,
    ) -> ServiceResult<serde_json::Value>;
}

/// One content file of a torrent, as reported by the client gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentContent {
    /// Position of the file within the torrent.
    pub index: usize,
    /// Absolute path of the file on disk.
    pub path: PathBuf,
}

/// Torrent-client protocol adapter, consumed for content-path resolution.
#[async_trait]
pub trait ClientGatewayService: Send + Sync {
    /// Resolve the content files of a torrent.
    async fn get_torrent_contents(&self, hash: &str) -> ServiceResult<Vec<TorrentContent>>;
}
