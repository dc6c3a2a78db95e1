//! Named store registry
//!
//! Stores live in a shared, origin-wide namespace addressed by name.
//! This manager owns only the names carrying its configured prefix; stores
//! created by anything else are left untouched by activation sweeps and
//! bulk clears.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::memory::MemoryStore;

/// Registry of named stores with prefix-scoped ownership
pub struct StoreRegistry {
    prefix: String,
    stores: RwLock<HashMap<String, Arc<MemoryStore>>>,
}

impl StoreRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            stores: RwLock::new(HashMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The store name for a given version tag: `{prefix}-{version}`
    pub fn name_for(&self, version: &str) -> String {
        format!("{}-{}", self.prefix, version)
    }

    /// Whether a store name falls inside this manager's namespace
    pub fn is_owned(&self, name: &str) -> bool {
        name.strip_prefix(&self.prefix)
            .map(|rest| rest.starts_with('-'))
            .unwrap_or(false)
    }

    /// Open a store by name, creating it empty if it does not exist yet
    pub fn open(&self, name: &str) -> Arc<MemoryStore> {
        {
            let stores = self.stores.read();
            if let Some(store) = stores.get(name) {
                return Arc::clone(store);
            }
        }

        let mut stores = self.stores.write();
        Arc::clone(
            stores
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryStore::new(name))),
        )
    }

    /// Look up a store without creating it
    pub fn find(&self, name: &str) -> Option<Arc<MemoryStore>> {
        let stores = self.stores.read();
        stores.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let stores = self.stores.read();
        stores.contains_key(name)
    }

    /// Delete a store by name
    /// Returns true if the store existed
    pub fn delete(&self, name: &str) -> bool {
        let mut stores = self.stores.write();
        stores.remove(name).is_some()
    }

    /// All store names currently registered, owned or not
    pub fn names(&self) -> Vec<String> {
        let stores = self.stores.read();
        let mut names: Vec<String> = stores.keys().cloned().collect();
        names.sort();
        names
    }

    /// Store names inside this manager's namespace
    pub fn owned_names(&self) -> Vec<String> {
        self.names()
            .into_iter()
            .filter(|name| self.is_owned(name))
            .collect()
    }

    /// Delete every owned store except `keep`.
    /// Returns the names that were deleted, for logging.
    pub fn purge_except(&self, keep: &str) -> Vec<String> {
        let mut stores = self.stores.write();
        let stale: Vec<String> = stores
            .keys()
            .filter(|name| self.is_owned(name) && name.as_str() != keep)
            .cloned()
            .collect();

        for name in &stale {
            stores.remove(name);
        }

        let mut stale = stale;
        stale.sort();
        stale
    }

    /// Delete every owned store.
    /// Returns the number of stores deleted.
    pub fn clear_owned(&self) -> usize {
        let mut stores = self.stores.write();
        let owned: Vec<String> = stores
            .keys()
            .filter(|name| self.is_owned(name))
            .cloned()
            .collect();

        for name in &owned {
            stores.remove(name);
        }

        owned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::entry::{AssetKey, AssetResponse};
    use crate::store::traits::Store;
    use bytes::Bytes;
    use url::Url;

    #[test]
    fn test_name_for_joins_prefix_and_version_with_dash() {
        let registry = StoreRegistry::new("cachette");
        assert_eq!(registry.name_for("v1.0"), "cachette-v1.0");
        assert_eq!(registry.name_for("2024-10"), "cachette-2024-10");
    }

    #[test]
    fn test_is_owned_requires_prefix_and_separator() {
        let registry = StoreRegistry::new("cachette");
        assert!(registry.is_owned("cachette-v1.0"));
        assert!(registry.is_owned("cachette-anything"));
        assert!(!registry.is_owned("cachette"));
        assert!(!registry.is_owned("cachettev1.0"));
        assert!(!registry.is_owned("other-cache-v1"));
    }

    #[test]
    fn test_open_creates_store_once_and_reuses_it() {
        let registry = StoreRegistry::new("cachette");

        let first = registry.open("cachette-v1.0");
        let second = registry.open("cachette-v1.0");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.names(), vec!["cachette-v1.0"]);
    }

    #[test]
    fn test_find_does_not_create() {
        let registry = StoreRegistry::new("cachette");
        assert!(registry.find("cachette-v1.0").is_none());
        registry.open("cachette-v1.0");
        assert!(registry.find("cachette-v1.0").is_some());
    }

    #[test]
    fn test_delete_reports_whether_store_existed() {
        let registry = StoreRegistry::new("cachette");
        registry.open("cachette-v1.0");

        assert!(registry.delete("cachette-v1.0"));
        assert!(!registry.delete("cachette-v1.0"));
        assert!(!registry.contains("cachette-v1.0"));
    }

    #[test]
    fn test_purge_except_keeps_current_and_foreign_stores() {
        let registry = StoreRegistry::new("cachette");
        registry.open("cachette-v1.0");
        registry.open("cachette-v1.1");
        registry.open("cachette-v2.0");
        registry.open("unrelated-data");

        let deleted = registry.purge_except("cachette-v2.0");

        assert_eq!(deleted, vec!["cachette-v1.0", "cachette-v1.1"]);
        assert!(registry.contains("cachette-v2.0"));
        assert!(registry.contains("unrelated-data"));
        assert!(!registry.contains("cachette-v1.0"));
    }

    #[test]
    fn test_purge_except_is_a_noop_when_only_current_exists() {
        let registry = StoreRegistry::new("cachette");
        registry.open("cachette-v1.0");

        let deleted = registry.purge_except("cachette-v1.0");

        assert!(deleted.is_empty());
        assert!(registry.contains("cachette-v1.0"));
    }

    #[test]
    fn test_clear_owned_spares_foreign_stores() {
        let registry = StoreRegistry::new("cachette");
        registry.open("cachette-v1.0");
        registry.open("cachette-v2.0");
        registry.open("unrelated-data");

        let deleted = registry.clear_owned();

        assert_eq!(deleted, 2);
        assert_eq!(registry.names(), vec!["unrelated-data"]);
    }

    #[tokio::test]
    async fn test_reopening_a_deleted_name_yields_an_empty_store() {
        let registry = StoreRegistry::new("cachette");
        let url = Url::parse("https://example.org/app.js").unwrap();
        let key = AssetKey::from_url(&url);

        let store = registry.open("cachette-v1.0");
        store
            .put(key.clone(), AssetResponse::new(200, vec![], Bytes::from("x")))
            .await
            .unwrap();

        registry.delete("cachette-v1.0");
        let reopened = registry.open("cachette-v1.0");

        assert!(reopened.get(&key).await.unwrap().is_none());
    }

    #[test]
    fn test_owned_names_filters_by_prefix() {
        let registry = StoreRegistry::new("cachette");
        registry.open("cachette-v1.0");
        registry.open("unrelated-data");

        assert_eq!(registry.owned_names(), vec!["cachette-v1.0"]);
        assert_eq!(registry.names().len(), 2);
    }
}
