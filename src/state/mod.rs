//! State persistence layer
//!
//! Two partitions: synced settings, and a local partition holding the
//! watchlist and the agent logs. Every call reads or writes one key whole.

use crate::error::AgentError;
use crate::models::{LogEntry, Settings, Watchlist};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Stored agent logs keep this many most recent entries
pub const MAX_STORED_LOGS: usize = 200;

/// Trait for state persistence
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    async fn load_settings(&self) -> Result<Settings>;
    async fn save_settings(&self, settings: &Settings) -> Result<()>;
    async fn load_watchlist(&self) -> Result<Watchlist>;
    async fn save_watchlist(&self, watchlist: &Watchlist) -> Result<()>;
    async fn load_logs(&self) -> Result<Vec<LogEntry>>;
    async fn save_logs(&self, logs: &[LogEntry]) -> Result<()>;
}

/// Append entries to the stored logs, trimming to the retention limit
pub async fn append_logs(store: &dyn StateStore, entries: &[LogEntry]) -> Result<()> {
    let mut logs = store.load_logs().await?;
    logs.extend_from_slice(entries);

    if logs.len() > MAX_STORED_LOGS {
        let excess = logs.len() - MAX_STORED_LOGS;
        logs.drain(..excess);
    }

    store.save_logs(&logs).await
}

/// In-memory state store for tests and ephemeral runs
#[derive(Default)]
pub struct InMemoryStateStore {
    settings: Arc<RwLock<Settings>>,
    watchlist: Arc<RwLock<Watchlist>>,
    logs: Arc<RwLock<Vec<LogEntry>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl StateStore for InMemoryStateStore {
    async fn load_settings(&self) -> Result<Settings> {
        Ok(self.settings.read().await.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        *self.settings.write().await = settings.clone();
        Ok(())
    }

    async fn load_watchlist(&self) -> Result<Watchlist> {
        Ok(self.watchlist.read().await.clone())
    }

    async fn save_watchlist(&self, watchlist: &Watchlist) -> Result<()> {
        *self.watchlist.write().await = watchlist.clone();
        Ok(())
    }

    async fn load_logs(&self) -> Result<Vec<LogEntry>> {
        Ok(self.logs.read().await.clone())
    }

    async fn save_logs(&self, logs: &[LogEntry]) -> Result<()> {
        *self.logs.write().await = logs.to_vec();
        Ok(())
    }
}

/// Durable store: one JSON document per key under a data directory
pub struct JsonFileStateStore {
    sync_dir: PathBuf,
    local_dir: PathBuf,
}

impl JsonFileStateStore {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let sync_dir = root.join("sync");
        let local_dir = root.join("local");

        tokio::fs::create_dir_all(&sync_dir).await?;
        tokio::fs::create_dir_all(&local_dir).await?;

        debug!(root = %root.display(), "Opened JSON state store");
        Ok(Self { sync_dir, local_dir })
    }

    async fn read_key<T: DeserializeOwned + Default>(&self, path: PathBuf) -> Result<T> {
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AgentError::State(format!("Corrupt state file {}: {}", path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temp file and rename so readers never see a partial value
    async fn write_key<T: Serialize + ?Sized>(&self, path: PathBuf, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StateStore for JsonFileStateStore {
    async fn load_settings(&self) -> Result<Settings> {
        self.read_key(self.sync_dir.join("settings.json")).await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.write_key(self.sync_dir.join("settings.json"), settings).await
    }

    async fn load_watchlist(&self) -> Result<Watchlist> {
        self.read_key(self.local_dir.join("watchlist.json")).await
    }

    async fn save_watchlist(&self, watchlist: &Watchlist) -> Result<()> {
        self.write_key(self.local_dir.join("watchlist.json"), watchlist).await
    }

    async fn load_logs(&self) -> Result<Vec<LogEntry>> {
        self.read_key(self.local_dir.join("agent_logs.json")).await
    }

    async fn save_logs(&self, logs: &[LogEntry]) -> Result<()> {
        self.write_key(self.local_dir.join("agent_logs.json"), logs).await
    }
}
