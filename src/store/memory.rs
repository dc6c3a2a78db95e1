//! Memory store implementation
//!
//! The whole store lives in process memory: entries persist for the life of
//! the process and are only removed by explicit deletion. There is no TTL
//! and no eviction, so a precached asset stays replayable until a new
//! version retires the store.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::entry::{AssetKey, AssetResponse};
use super::error::StoreError;
use super::stats::{StatsTracker, StoreStats};
use super::traits::Store;

/// In-memory store keyed by absolute URL
pub struct MemoryStore {
    name: String,
    entries: RwLock<HashMap<AssetKey, AssetResponse>>,
    stats: StatsTracker,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
            stats: StatsTracker::new(),
        }
    }

    /// The versioned name this store was opened under
    pub fn name(&self) -> &str {
        &self.name
    }

    fn size_bytes(&self) -> u64 {
        let entries = self.entries.read();
        entries
            .values()
            .map(|response| response.size_bytes() as u64)
            .sum()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &AssetKey) -> Result<Option<AssetResponse>, StoreError> {
        let found = {
            let entries = self.entries.read();
            entries.get(key).cloned()
        };

        match found {
            Some(response) => {
                self.stats.record_hit();
                Ok(Some(response))
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn put(&self, key: AssetKey, response: AssetResponse) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.write();
            entries.insert(key, response);
        }
        self.stats.record_write();
        Ok(())
    }

    async fn delete(&self, key: &AssetKey) -> Result<bool, StoreError> {
        let mut entries = self.entries.write();
        Ok(entries.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<AssetKey>, StoreError> {
        let entries = self.entries.read();
        Ok(entries.keys().cloned().collect())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        let entries = self.entries.read();
        Ok(entries.len())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        entries.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let entry_count = {
            let entries = self.entries.read();
            entries.len() as u64
        };
        Ok(self.stats.snapshot(entry_count, self.size_bytes()))
    }
}
