//! Credential Store
//!
//! Durable key/value storage for the session tokens and the cached user
//! snapshot. Implementations hold no logic beyond get/set/remove.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Key under which the access token is written and read.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Key under which the refresh token is written and read.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Key under which the signed-in user snapshot is cached.
pub const USER_KEY: &str = "user";

/// Credential store interface.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Returns whether a value was present.
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-memory credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    /// Create new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.values.lock().remove(key).is_some())
    }
}

/// Credential store persisted as a single JSON document on disk.
///
/// Writes are serialized through an async lock so concurrent `set` calls
/// cannot interleave their read-modify-write cycles.
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileCredentialStore {
    /// Create a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&content).map_err(|e| StorageError::CorruptedData {
            message: format!("{}: {}", self.path.display(), e),
        })
    }

    async fn save(&self, key: &str, values: &HashMap<String, String>) -> Result<(), StorageError> {
        let write_failed = |message: String| StorageError::WriteFailed {
            key: key.to_string(),
            message,
        };

        let content =
            serde_json::to_string_pretty(values).map_err(|e| write_failed(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failed(e.to_string()))?;
        }

        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, content)
            .await
            .map_err(|e| write_failed(e.to_string()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| write_failed(e.to_string()))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut values = self.load(key).await?;
        Ok(values.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.load(key).await?;
        values.insert(key.to_string(), value.to_string());
        self.save(key, &values).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.load(key).await?;
        let removed = values.remove(key).is_some();
        if removed {
            self.save(key, &values).await.map_err(|e| match e {
                StorageError::WriteFailed { key, message } => {
                    StorageError::DeleteFailed { key, message }
                }
                other => other,
            })?;
        }
        Ok(removed)
    }
}

/// Mock credential store for testing.
#[derive(Default)]
pub struct MockCredentialStore {
    values: Mutex<HashMap<String, String>>,
    set_history: Mutex<Vec<(String, String)>>,
    get_history: Mutex<Vec<String>>,
    remove_history: Mutex<Vec<String>>,
    fail_reads: Mutex<bool>,
    fail_writes: Mutex<bool>,
}

impl MockCredentialStore {
    /// Create new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a value.
    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.values.lock().insert(key.to_string(), value.to_string());
        self
    }

    /// Make every read fail.
    pub fn set_fail_reads(&self, fail: bool) -> &Self {
        *self.fail_reads.lock() = fail;
        self
    }

    /// Make every write and remove fail.
    pub fn set_fail_writes(&self, fail: bool) -> &Self {
        *self.fail_writes.lock() = fail;
        self
    }

    /// Current value without recording history.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    /// Get write history.
    pub fn get_set_history(&self) -> Vec<(String, String)> {
        self.set_history.lock().clone()
    }

    /// Get read history.
    pub fn get_get_history(&self) -> Vec<String> {
        self.get_history.lock().clone()
    }

    /// Get remove history.
    pub fn get_remove_history(&self) -> Vec<String> {
        self.remove_history.lock().clone()
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.get_history.lock().push(key.to_string());
        if *self.fail_reads.lock() {
            return Err(StorageError::ReadFailed {
                key: key.to_string(),
                message: "Mock storage failure".to_string(),
            });
        }
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if *self.fail_writes.lock() {
            return Err(StorageError::WriteFailed {
                key: key.to_string(),
                message: "Mock storage failure".to_string(),
            });
        }
        self.set_history
            .lock()
            .push((key.to_string(), value.to_string()));
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        if *self.fail_writes.lock() {
            return Err(StorageError::DeleteFailed {
                key: key.to_string(),
                message: "Mock storage failure".to_string(),
            });
        }
        self.remove_history.lock().push(key.to_string());
        Ok(self.values.lock().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_set_get_remove() {
        let store = InMemoryCredentialStore::new();

        store.set(ACCESS_TOKEN_KEY, "a1").await.unwrap();
        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap(), Some("a1".to_string()));

        assert!(store.remove(ACCESS_TOKEN_KEY).await.unwrap());
        assert!(!store.remove(ACCESS_TOKEN_KEY).await.unwrap());
        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("credentials.json");

        let store = FileCredentialStore::new(&path);
        assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap(), None);

        store.set(ACCESS_TOKEN_KEY, "a1").await.unwrap();
        store.set(REFRESH_TOKEN_KEY, "r1").await.unwrap();

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).await.unwrap(), Some("a1".to_string()));
        assert_eq!(reopened.get(REFRESH_TOKEN_KEY).await.unwrap(), Some("r1".to_string()));

        assert!(reopened.remove(ACCESS_TOKEN_KEY).await.unwrap());
        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap(), None);
        assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap(), Some("r1".to_string()));
    }

    #[tokio::test]
    async fn test_file_store_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = FileCredentialStore::new(&path);
        let result = store.get(ACCESS_TOKEN_KEY).await;
        assert!(matches!(result, Err(StorageError::CorruptedData { .. })));
    }

    #[tokio::test]
    async fn test_mock_store_history_and_failure() {
        let store = MockCredentialStore::new().with_value(ACCESS_TOKEN_KEY, "a1");

        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.unwrap(), Some("a1".to_string()));
        store.set(REFRESH_TOKEN_KEY, "r1").await.unwrap();

        assert_eq!(store.get_get_history(), vec![ACCESS_TOKEN_KEY.to_string()]);
        assert_eq!(
            store.get_set_history(),
            vec![(REFRESH_TOKEN_KEY.to_string(), "r1".to_string())]
        );

        store.set_fail_writes(true);
        assert!(store.set(ACCESS_TOKEN_KEY, "a2").await.is_err());
        assert_eq!(store.peek(ACCESS_TOKEN_KEY), Some("a1".to_string()));

        store.set_fail_reads(true);
        assert!(store.get(ACCESS_TOKEN_KEY).await.is_err());
    }
}
