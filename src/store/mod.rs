//! Named, persistent string-to-string mappings that queues are staged in.
//!
//! A [`StoreBackend`] opens mappings by name; each opened [`KeyValueStore`]
//! is atomic per key and safe to share between concurrent handlers. No
//! multi-key transactions are offered.

pub mod file;
pub mod memory;

pub use file::{FileBackend, FileStore};
pub use memory::{MemoryBackend, MemoryStore};

use crate::config::{ReplayConfig, StoreKind};
use crate::error::{ReplayError, Result};
use std::sync::Arc;

#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Point-in-time copy of every entry, in no particular order.
    async fn entries(&self) -> Result<Vec<(String, String)>>;

    async fn len(&self) -> Result<usize> {
        Ok(self.entries().await?.len())
    }

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait::async_trait]
pub trait StoreBackend: Send + Sync {
    /// Open the mapping called `name`, creating it if absent. Opening the
    /// same name twice yields handles onto the same entries.
    async fn open(&self, name: &str) -> Result<Arc<dyn KeyValueStore>>;
}

/// Store names end up as file names, so keep them to a safe alphabet.
pub fn validate_store_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ReplayError::InvalidStoreName(name.to_string()))
    }
}

/// Build the backend selected by `config.store`.
pub fn backend_from_config(config: &ReplayConfig) -> Arc<dyn StoreBackend> {
    match config.store {
        StoreKind::File => Arc::new(FileBackend::new(&config.data_dir)),
        StoreKind::Memory => Arc::new(MemoryBackend::new()),
    }
}
