//! Store trait definition
//!
//! This module defines the `Store` trait that every store backend must
//! satisfy. Strategy code only ever talks to `dyn Store`, so alternative
//! backends (and test doubles) drop in without touching resolution logic.

use async_trait::async_trait;

use super::entry::{AssetKey, AssetResponse};
use super::error::StoreError;
use super::stats::StoreStats;

/// Store interface for response snapshots
#[async_trait]
pub trait Store: Send + Sync {
    /// Get a stored response by key
    /// Returns None if the key is not present
    async fn get(&self, key: &AssetKey) -> Result<Option<AssetResponse>, StoreError>;

    /// Write a response snapshot
    /// Overwrites any existing entry under the same key
    async fn put(&self, key: AssetKey, response: AssetResponse) -> Result<(), StoreError>;

    /// Delete a stored response by key
    /// Returns true if an entry was deleted, false if it didn't exist
    async fn delete(&self, key: &AssetKey) -> Result<bool, StoreError>;

    /// List every key currently present
    async fn keys(&self) -> Result<Vec<AssetKey>, StoreError>;

    /// Number of entries currently present
    async fn len(&self) -> Result<usize, StoreError>;

    /// Remove all entries
    async fn clear(&self) -> Result<(), StoreError>;

    /// Get store statistics
    async fn stats(&self) -> Result<StoreStats, StoreError>;
}
