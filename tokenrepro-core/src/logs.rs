// tokenrepro-core/src/logs.rs
//
// Bounded, most-recent-first history of token retrieval attempts, persisted
// as one JSON array under a fixed key.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error};

use crate::Error;
use crate::models::LogEntry;
use crate::traits::KeyValueStore;

pub const LOGS_STORAGE_KEY: &str = "@clerk_tiktok_logs";
pub const MAX_LOG_ENTRIES: usize = 50;

pub struct LogStore {
    store: Arc<dyn KeyValueStore>,
    entries: RwLock<Vec<LogEntry>>,
    /// Serializes persistence so the file always holds the newest snapshot.
    persist_lock: Mutex<()>,
}

impl LogStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(Vec::new()),
            persist_lock: Mutex::new(()),
        }
    }

    /// Reads the persisted collection into memory. Missing or unreadable
    /// data leaves an empty collection; failures are only logged.
    pub async fn load(&self) -> Vec<LogEntry> {
        let loaded = match self.store.get_item(LOGS_STORAGE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<LogEntry>>(&raw) {
                Ok(mut entries) => {
                    entries.truncate(MAX_LOG_ENTRIES);
                    entries
                }
                Err(e) => {
                    error!("Failed to load logs: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("Failed to load logs: {}", e);
                Vec::new()
            }
        };
        debug!("Loaded {} log entries", loaded.len());

        let mut entries = self.entries.write().await;
        *entries = loaded;
        entries.clone()
    }

    /// Prepends `entry`, keeps the newest `MAX_LOG_ENTRIES`, and rewrites the
    /// persisted collection. Memory is updated first and is not rolled back
    /// when the write fails.
    pub async fn append(&self, entry: LogEntry) {
        let _persist = self.persist_lock.lock().await;

        let snapshot = {
            let mut entries = self.entries.write().await;
            entries.insert(0, entry);
            entries.truncate(MAX_LOG_ENTRIES);
            entries.clone()
        };

        let raw = match serde_json::to_string(&snapshot) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to save log: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set_item(LOGS_STORAGE_KEY, &raw).await {
            error!("Failed to save log: {}", e);
        }
    }

    /// Deletes the persisted collection, then empties memory. On failure the
    /// in-memory entries are left as they were.
    pub async fn clear(&self) -> Result<(), Error> {
        let _persist = self.persist_lock.lock().await;
        self.store.remove_item(LOGS_STORAGE_KEY).await.map_err(|e| {
            error!("Failed to clear logs: {}", e);
            e
        })?;
        self.entries.write().await.clear();
        Ok(())
    }

    pub async fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;
    use async_trait::async_trait;
    use serde_json::json;

    fn entry(n: usize) -> LogEntry {
        LogEntry::from_response(json!({"success": true, "n": n}), Some("user_1".into()))
    }

    /// Reads succeed, every write fails.
    struct ReadOnlyStore;

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get_item(&self, _key: &str) -> Result<Option<String>, Error> {
            Ok(None)
        }
        async fn set_item(&self, _key: &str, _value: &str) -> Result<(), Error> {
            Err(Error::Storage("disk full".into()))
        }
        async fn remove_item(&self, _key: &str) -> Result<(), Error> {
            Err(Error::Storage("read-only".into()))
        }
    }

    #[tokio::test]
    async fn never_exceeds_cap_and_evicts_oldest() {
        let backing = Arc::new(MemoryKeyValueStore::new());
        let logs = LogStore::new(backing.clone());

        for n in 0..(MAX_LOG_ENTRIES + 7) {
            logs.append(entry(n)).await;
            assert!(logs.len().await <= MAX_LOG_ENTRIES);
        }

        let entries = logs.entries().await;
        assert_eq!(entries.len(), MAX_LOG_ENTRIES);
        // newest first, the 7 oldest are gone
        assert_eq!(entries[0].response["n"], MAX_LOG_ENTRIES + 6);
        assert_eq!(entries[MAX_LOG_ENTRIES - 1].response["n"], 7);

        let persisted: Vec<LogEntry> =
            serde_json::from_str(&backing.get_item(LOGS_STORAGE_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(persisted, entries);
    }

    #[tokio::test]
    async fn load_restores_persisted_entries() {
        let backing = Arc::new(MemoryKeyValueStore::new());
        {
            let logs = LogStore::new(backing.clone());
            logs.append(entry(1)).await;
            logs.append(entry(2)).await;
        }

        let reopened = LogStore::new(backing);
        let loaded = reopened.load().await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].response["n"], 2);
    }

    #[tokio::test]
    async fn clear_then_load_is_empty() {
        let backing = Arc::new(MemoryKeyValueStore::new());
        let logs = LogStore::new(backing.clone());
        logs.append(entry(1)).await;

        logs.clear().await.unwrap();
        assert!(logs.is_empty().await);
        assert!(!backing.contains(LOGS_STORAGE_KEY));
        assert!(logs.load().await.is_empty());
    }

    #[tokio::test]
    async fn unparseable_data_loads_empty() {
        let backing = Arc::new(MemoryKeyValueStore::new());
        backing.set_item(LOGS_STORAGE_KEY, "{not json").await.unwrap();

        let logs = LogStore::new(backing);
        assert!(logs.load().await.is_empty());
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_updated() {
        let logs = LogStore::new(Arc::new(ReadOnlyStore));
        logs.append(entry(1)).await;
        assert_eq!(logs.len().await, 1);
    }

    #[tokio::test]
    async fn failed_clear_is_reported_and_keeps_entries() {
        let logs = LogStore::new(Arc::new(ReadOnlyStore));
        logs.append(entry(1)).await;
        assert!(logs.clear().await.is_err());
        assert_eq!(logs.len().await, 1);
    }
}
