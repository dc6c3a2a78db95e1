//! Versioned asset stores
//!
//! A store maps absolute URLs to complete response snapshots. Stores are
//! addressed by name through a registry; the active store for a manager
//! version `V` is always named `{prefix}-{V}`, which is what lets
//! activation retire every other version by name alone.

pub mod entry;
pub mod error;
pub mod memory;
pub mod registry;
pub mod stats;
pub mod traits;

pub use entry::{AssetKey, AssetResponse};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use registry::StoreRegistry;
pub use stats::StoreStats;
pub use traits::Store;
