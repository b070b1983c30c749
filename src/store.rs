//! Local key-value persistence for the application state.
//!
//! The whole `AppState` lives under a single key and is overwritten on every change. There is
//! no versioning and no partial read.

use crate::model::AppState;
use crate::{utils, Result};
use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

/// The key that holds the serialized `AppState`.
pub const STATE_KEY: &str = "rentpacer_state";

/// A minimal string blob store.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns `None` when nothing has been stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl BlobStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        trace!("get {}", path.display());
        if !path.is_file() {
            return Ok(None);
        }
        utils::read(&path).await.map(Some)
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        trace!("put {}", path.display());
        utils::write_atomic(&path, value).await
    }
}

/// Keeps blobs in memory. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, String>>>,
}

#[async_trait::async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.data
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and parses the state. `None` if it was never saved.
pub async fn load_state(store: &dyn BlobStore) -> Result<Option<AppState>> {
    let Some(json) = store
        .get(STATE_KEY)
        .await
        .context("Unable to read the saved state")?
    else {
        return Ok(None);
    };
    let state = serde_json::from_str(&json)
        .with_context(|| format!("The saved state under '{STATE_KEY}' is malformed"))?;
    Ok(Some(state))
}

/// Serializes and overwrites the state.
pub async fn save_state(store: &dyn BlobStore, state: &AppState) -> Result<()> {
    let json = serde_json::to_string_pretty(state).context("Unable to serialize the state")?;
    store
        .put(STATE_KEY, &json)
        .await
        .context("Unable to save the state")
}
