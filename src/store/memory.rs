use super::{validate_store_name, KeyValueStore, StoreBackend};
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;

/// Process-local store. Entries vanish when the process exits.
pub struct MemoryStore {
    name: String,
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: DashMap::new(),
        }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }
}

/// Hands out one shared [`MemoryStore`] per name.
#[derive(Default)]
pub struct MemoryBackend {
    stores: DashMap<String, Arc<MemoryStore>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StoreBackend for MemoryBackend {
    async fn open(&self, name: &str) -> Result<Arc<dyn KeyValueStore>> {
        validate_store_name(name)?;
        let store = self
            .stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::new(name)))
            .clone();
        Ok(store)
    }
}
