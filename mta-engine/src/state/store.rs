//! File-backed state store: fingerprint → processing record
//!
//! The whole map lives in one JSON document. Every operation is a full read
//! (and, for mutations, a full rewrite) under one hold of the [`StateLock`];
//! nothing is cached between calls. Cost per mutation is O(n) in the number of
//! live records, which TTL eviction keeps bounded.
//!
//! Entries whose `processedAt` is at or before `now - ttl` are evicted on every
//! load and every save.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use mta_common::config::{EngineConfig, StateSettings};
use mta_common::time::{cutoff_for_ttl_days, now};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::lock::{LockError, StateLock, StateLockGuard};
use crate::models::{Fingerprint, ProcessingRecord};
use crate::utils::atomic_write;

/// In-memory form of the state document
pub type StateMap = BTreeMap<Fingerprint, ProcessingRecord>;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// State persistence errors
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Permission denied accessing state file {}: {}", .path.display(), .source)]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No space left on device for state file {}", .path.display())]
    StorageFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("State file I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StateError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::PermissionDenied => StateError::PermissionDenied { path, source },
            io::ErrorKind::StorageFull => StateError::StorageFull { path, source },
            _ => StateError::Io { path, source },
        }
    }

    /// Lock contention rather than a storage fault
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, StateError::Lock(LockError::Timeout { .. }))
    }
}

/// Remove records at or before `cutoff`; returns how many were removed
pub fn evict_expired(map: &mut StateMap, cutoff: DateTime<Utc>) -> usize {
    let before = map.len();
    map.retain(|_, record| record.is_live(cutoff));
    before - map.len()
}

#[derive(Debug, Clone)]
pub struct StateStore {
    state_path: PathBuf,
    lock: StateLock,
    ttl_days: u32,
    max_size_bytes: u64,
}

impl StateStore {
    pub fn new(state_path: impl Into<PathBuf>, lock: StateLock, settings: &StateSettings) -> Self {
        Self {
            state_path: state_path.into(),
            lock,
            ttl_days: settings.ttl_days,
            max_size_bytes: settings.max_size_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.state_file(),
            StateLock::new(config.lock_file(), &config.lock),
            &config.state,
        )
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn lock(&self) -> &StateLock {
        &self.lock
    }

    /// Read the document, dropping expired and unreadable entries
    pub async fn load(&self) -> Result<StateMap, StateError> {
        let guard = self.lock.acquire().await?;
        let held = Instant::now();
        let result = self.read_unlocked().await;
        self.finish(guard, held, "load").await;
        result
    }

    /// Replace the document with `map`, minus expired entries
    pub async fn save(&self, mut map: StateMap) -> Result<(), StateError> {
        let guard = self.lock.acquire().await?;
        let held = Instant::now();
        let result = self.write_unlocked(&mut map).await;
        self.finish(guard, held, "save").await;
        result
    }

    /// Look up one fingerprint (full load under the lock)
    pub async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<ProcessingRecord>, StateError> {
        Ok(self.load().await?.remove(fingerprint))
    }

    /// Insert one record: load, mutate and save under a single lock hold
    pub async fn put(&self, fingerprint: Fingerprint, record: ProcessingRecord) -> Result<(), StateError> {
        let guard = self.lock.acquire().await?;
        let held = Instant::now();
        let result = async {
            let mut map = self.read_unlocked().await?;
            map.insert(fingerprint, record);
            self.write_unlocked(&mut map).await
        }
        .await;
        self.finish(guard, held, "put").await;
        result
    }

    async fn finish(&self, guard: StateLockGuard, held: Instant, operation: &'static str) {
        let held_ms = held.elapsed().as_millis() as u64;
        if held_ms > 1000 {
            warn!(operation, held_ms, "State lock held longer than expected (>1s)");
        } else {
            debug!(operation, held_ms, "State lock released");
        }
        if let Err(e) = guard.release().await {
            warn!(operation, "Failed to release state lock: {}", e);
        }
    }

    fn cutoff(&self) -> DateTime<Utc> {
        cutoff_for_ttl_days(now(), self.ttl_days)
    }

    async fn read_unlocked(&self) -> Result<StateMap, StateError> {
        let content = match tokio::fs::read_to_string(&self.state_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StateMap::new()),
            Err(e) => return Err(StateError::from_io(&self.state_path, e)),
        };

        let size = content.len() as u64;
        if size > self.max_size_bytes {
            warn!(
                size_mb = %format!("{:.2}", size as f64 / BYTES_PER_MB as f64),
                limit_mb = self.max_size_bytes / BYTES_PER_MB,
                "State file size exceeds recommended limit"
            );
        }

        let raw: BTreeMap<String, Value> = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    path = %self.state_path.display(),
                    "State file contains invalid JSON ({}), starting with empty state", e
                );
                return Ok(StateMap::new());
            }
        };

        let mut map = StateMap::new();
        for (key, value) in raw {
            match serde_json::from_value::<ProcessingRecord>(value) {
                Ok(record) => {
                    map.insert(Fingerprint::from_hex(key), record);
                }
                Err(e) => warn!(fingerprint = %key, "Dropping unreadable state entry: {}", e),
            }
        }

        let removed = evict_expired(&mut map, self.cutoff());
        if removed > 0 {
            info!(removed, remaining = map.len(), "Cleaned up old state entries");
        }
        Ok(map)
    }

    async fn write_unlocked(&self, map: &mut StateMap) -> Result<(), StateError> {
        let removed = evict_expired(map, self.cutoff());
        if removed > 0 {
            info!(removed, "Evicted expired state entries before save");
        }

        let json = serde_json::to_string_pretty(&*map)?;
        if let Some(parent) = self.state_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StateError::from_io(parent, e))?;
        }
        atomic_write(&self.state_path, json.as_bytes())
            .await
            .map_err(|e| StateError::from_io(&self.state_path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Department;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir, ttl_days: u32) -> StateStore {
        let lock = StateLock::with_timings(
            dir.path().join("state.lock"),
            Duration::from_millis(500),
            Duration::from_secs(30),
            Duration::from_millis(10),
        );
        StateStore::new(
            dir.path().join("state.json"),
            lock,
            &StateSettings {
                ttl_days,
                max_size_mb: 10,
            },
        )
    }

    fn record(task: &str, age_days: i64) -> ProcessingRecord {
        ProcessingRecord {
            task: task.to_string(),
            department: Department::Design,
            meeting_name: "Weekly sync".to_string(),
            external_task_id: Some(format!("ext-{}", task.len())),
            processed_at: Utc::now() - ChronoDuration::days(age_days),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 30);
        assert!(store.load().await.unwrap().is_empty());
        assert!(!store.lock().is_held().await);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 30);
        let fp = Fingerprint::of("Label design");

        store.put(fp.clone(), record("Label design", 0)).await.unwrap();

        let found = store.get(&fp).await.unwrap().unwrap();
        assert_eq!(found.task, "Label design");
        assert!(store.get(&Fingerprint::of("Other task")).await.unwrap().is_none());
        assert!(!store.lock().is_held().await);
    }

    #[tokio::test]
    async fn test_document_is_keyed_by_hex_digest() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 30);
        let fp = Fingerprint::of("Commercial costing");
        store.put(fp.clone(), record("Commercial costing", 0)).await.unwrap();

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(store.state_path()).unwrap()).unwrap();
        let entry = &doc[fp.as_str()];
        assert_eq!(entry["task"], "Commercial costing");
        assert_eq!(entry["department"], "Design");
        assert!(entry["processedAt"].is_string());
    }

    #[tokio::test]
    async fn test_load_evicts_expired_entries() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 30);

        let mut doc = serde_json::Map::new();
        doc.insert(
            Fingerprint::of("old").to_string(),
            serde_json::to_value(record("old", 45)).unwrap(),
        );
        doc.insert(
            Fingerprint::of("fresh").to_string(),
            serde_json::to_value(record("fresh", 1)).unwrap(),
        );
        std::fs::write(store.state_path(), Value::Object(doc).to_string()).unwrap();

        let map = store.load().await.unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&Fingerprint::of("fresh")));
    }

    #[tokio::test]
    async fn test_save_evicts_expired_entries() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 7);

        let mut map = StateMap::new();
        map.insert(Fingerprint::of("old"), record("old", 8));
        map.insert(Fingerprint::of("fresh"), record("fresh", 6));
        store.save(map).await.unwrap();

        let content = std::fs::read_to_string(store.state_path()).unwrap();
        assert!(!content.contains(Fingerprint::of("old").as_str()));
        assert!(content.contains(Fingerprint::of("fresh").as_str()));
    }

    #[tokio::test]
    async fn test_corrupt_document_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 30);
        std::fs::write(store.state_path(), "{ this is not json").unwrap();

        assert!(store.load().await.unwrap().is_empty());

        // The next put replaces the corrupt document
        store.put(Fingerprint::of("Label design"), record("Label design", 0)).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_dropped_individually() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 30);
        let good = Fingerprint::of("good");
        let doc = serde_json::json!({
            (good.to_string()): record("good", 0),
            "deadbeef": { "task": "no timestamp" }
        });
        std::fs::write(store.state_path(), doc.to_string()).unwrap();

        let map = store.load().await.unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&good));
    }

    #[tokio::test]
    async fn test_directory_in_place_of_state_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 30);
        std::fs::create_dir(store.state_path()).unwrap();

        let result = store.load().await;
        assert!(matches!(result, Err(StateError::Io { .. })));
        assert!(!store.lock().is_held().await);
    }

    #[tokio::test]
    async fn test_lock_timeout_surfaces_as_state_error() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 30);
        let _held = store.lock().acquire().await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(err.is_lock_timeout());
    }

    #[tokio::test]
    async fn test_concurrent_puts_are_serialized() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir, 30);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let task = format!("Task number {}", i);
                store.put(Fingerprint::of(&task), record(&task, 0)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.unwrap().len(), 8);
    }

    #[test]
    fn test_evict_expired_boundary() {
        let cutoff = Utc::now();
        let mut map = StateMap::new();
        let mut at_cutoff = record("at", 0);
        at_cutoff.processed_at = cutoff;
        let mut after = record("after", 0);
        after.processed_at = cutoff + ChronoDuration::milliseconds(1);
        map.insert(Fingerprint::of("at"), at_cutoff);
        map.insert(Fingerprint::of("after"), after);

        assert_eq!(evict_expired(&mut map, cutoff), 1);
        assert!(map.contains_key(&Fingerprint::of("after")));
    }
}
