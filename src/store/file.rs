use super::{validate_store_name, KeyValueStore, StoreBackend};
use crate::error::{ReplayError, Result};
use fs2::FileExt;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store persisted as a single JSON object at `<dir>/<name>.json`.
///
/// Every operation takes an exclusive advisory lock on `<name>.json.lock`
/// and reads the document fresh from disk, so handles in other processes
/// sharing the data directory never overwrite each other's entries.
/// Mutations rewrite the file via temp file + rename; a crash leaves either
/// the old or the new document, and a failed write leaves the old one.
pub struct FileStore {
    name: String,
    path: PathBuf,
    lock_path: PathBuf,
    // Serializes this handle's callers before they contend on the file lock.
    local: Mutex<()>,
}

impl FileStore {
    pub async fn open(dir: &Path, name: &str) -> Result<Self> {
        validate_store_name(name)?;
        tokio::fs::create_dir_all(dir).await?;

        let store = Self {
            name: name.to_string(),
            path: dir.join(format!("{}.json", name)),
            lock_path: dir.join(format!("{}.json.lock", name)),
            local: Mutex::new(()),
        };

        let count = store.locked(|data| Ok((data.len(), false))).await?;
        tracing::debug!(
            "[store] Opened {} ({} entries) at {}",
            name,
            count,
            store.path.display()
        );

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `op` against the on-disk document while holding the file lock.
    /// When `op` reports a change, the document is written back before the
    /// lock is released.
    async fn locked<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> Result<(T, bool)> + Send + 'static,
        T: Send + 'static,
    {
        let _guard = self.local.lock().await;
        let name = self.name.clone();
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();

        tokio::task::spawn_blocking(move || -> Result<T> {
            let lock = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)?;
            lock.lock_exclusive()?;

            let mut data = load(&path)?;
            let (out, changed) = op(&mut data)?;
            if changed {
                persist(&path, &data)
                    .map_err(|e| ReplayError::Store(format!("{}: {}", name, e)))?;
            }
            // Closing `lock` releases it.
            Ok(out)
        })
        .await
        .map_err(|e| ReplayError::Store(format!("{}: store task failed: {}", self.name, e)))?
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, String>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(ReplayError::Store(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
        Ok(data) => Ok(data),
        Err(e) => {
            let aside = path.with_extension("json.corrupt");
            tracing::warn!(
                "[store] Failed to parse {}, moving it to {} and starting empty: {}",
                path.display(),
                aside.display(),
                e
            );
            if let Err(e) = std::fs::rename(path, &aside) {
                tracing::warn!("[store] Failed to move corrupt store aside: {}", e);
            }
            Ok(BTreeMap::new())
        }
    }
}

fn persist(path: &Path, data: &BTreeMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.locked(move |data| Ok((data.get(&key).cloned(), false)))
            .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.locked(move |data| {
            let changed = data.get(&key) != Some(&value);
            data.insert(key, value);
            Ok(((), changed))
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.locked(move |data| Ok(((), data.remove(&key).is_some())))
            .await
    }

    async fn entries(&self) -> Result<Vec<(String, String)>> {
        self.locked(|data| {
            let entries: Vec<(String, String)> = data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Ok((entries, false))
        })
        .await
    }

    async fn len(&self) -> Result<usize> {
        self.locked(|data| Ok((data.len(), false))).await
    }
}

/// Opens [`FileStore`]s under a data directory, one shared handle per name.
pub struct FileBackend {
    dir: PathBuf,
    open: Mutex<HashMap<String, Arc<FileStore>>>,
}

impl FileBackend {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            open: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl StoreBackend for FileBackend {
    async fn open(&self, name: &str) -> Result<Arc<dyn KeyValueStore>> {
        let mut open = self.open.lock().await;
        if let Some(store) = open.get(name) {
            return Ok(store.clone());
        }
        let store = Arc::new(FileStore::open(&self.dir, name).await?);
        open.insert(name.to_string(), store.clone());
        Ok(store)
    }
}
