use crate::core::error::StoreError;
use crate::core::models::{Scope, SettingKey, Track};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Durable scalar key-value store for region lists, cursors and the install id.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: SettingKey) -> Result<Option<Value>, StoreError>;
    async fn put(&self, key: SettingKey, value: Value) -> Result<(), StoreError>;

    /// Configured scopes in stored order. Absent means none configured.
    async fn inventory_regions(&self) -> Result<Vec<String>, StoreError> {
        let key = SettingKey::InventoryRegions;
        match self.get(key).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(region) => Ok(region),
                    _ => Err(StoreError::UnexpectedType {
                        key: key.as_str(),
                        expected: "list of strings",
                    }),
                })
                .collect(),
            Some(_) => Err(StoreError::UnexpectedType {
                key: key.as_str(),
                expected: "list of strings",
            }),
        }
    }

    async fn set_inventory_regions(&self, regions: &[String]) -> Result<(), StoreError> {
        self.put(SettingKey::InventoryRegions, Value::from(regions.to_vec()))
            .await
    }

    async fn cursor(&self, track: Track) -> Result<Option<String>, StoreError> {
        let key = SettingKey::Cursor(track);
        string_value(key, self.get(key).await?)
    }

    async fn set_cursor(&self, track: Track, scope: &Scope) -> Result<(), StoreError> {
        self.put(SettingKey::Cursor(track), Value::String(scope.to_string()))
            .await
    }

    async fn install_id(&self) -> Result<Option<String>, StoreError> {
        let key = SettingKey::InstallId;
        string_value(key, self.get(key).await?)
    }

    async fn set_install_id(&self, id: &str) -> Result<(), StoreError> {
        self.put(SettingKey::InstallId, Value::String(id.to_string()))
            .await
    }
}

fn string_value(key: SettingKey, value: Option<Value>) -> Result<Option<String>, StoreError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(StoreError::UnexpectedType {
            key: key.as_str(),
            expected: "string",
        }),
    }
}

/// Settings kept as a single JSON object on disk.
///
/// Every `put` rewrites the whole document through a temporary file and a rename,
/// so a crash mid-write leaves the previous contents intact.
pub struct FileSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("media-inventory").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn snapshot(&self) -> Result<Map<String, Value>, StoreError> {
        let _guard = self.lock.lock().await;
        self.read_document().await
    }

    async fn read_document(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let content = serde_json::to_string_pretty(document).map_err(StoreError::Encode)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await.map_err(io_error)?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(io_error)?;

        tracing::trace!(path = ?self.path, "Saved settings store");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, key: SettingKey) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        Ok(document.remove(key.as_str()))
    }

    async fn put(&self, key: SettingKey, value: Value) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        document.insert(key.as_str().to_string(), value);
        self.write_document(&document).await
    }
}

/// Process-local store. Writes are lost on exit.
#[derive(Clone, Default)]
pub struct MemorySettingsStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot.into_iter().collect())),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: SettingKey) -> Result<Option<Value>, StoreError> {
        Ok(self.inner.read().await.get(key.as_str()).cloned())
    }

    async fn put(&self, key: SettingKey, value: Value) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .insert(key.as_str().to_string(), value);
        Ok(())
    }
}
