use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{check_key, DocumentStore};
use crate::error::StorageError;

/// On-disk wrapper: file names are hashed, so the key travels with the document.
#[derive(Serialize, Deserialize)]
struct Envelope {
    key: String,
    document: Value,
}

/// JSON-file document store
///
/// Layout: `<base_dir>/<collection>/<sha256(key)>.json`. Hashing the key keeps
/// file names bounded and path-safe whatever the key holds (a full bearer
/// token is longer than most filesystems allow for a name).
///
/// Every write lands in a temp file first. `create` publishes it with a hard
/// link, which fails atomically if the target exists; `update` renames over
/// the old file. Readers never observe a half-written document.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn collection_dir(&self, collection: &str) -> Result<PathBuf, StorageError> {
        check_key(collection)?;
        if !collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(StorageError::InvalidKey(collection.to_string()));
        }
        Ok(self.base_dir.join(collection))
    }

    fn document_path(&self, collection: &str, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        let dir = self.collection_dir(collection)?;
        Ok(dir.join(format!("{}.json", hash_key(key))))
    }

    async fn write_temp(&self, dir: &Path, key: &str, document: &Value) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(dir).await?;
        let envelope = Envelope {
            key: key.to_string(),
            document: document.clone(),
        };
        let bytes = serde_json::to_vec(&envelope)?;
        let temp = dir.join(format!(".{}.{}.tmp", hash_key(key), uuid::Uuid::new_v4()));
        fs::write(&temp, bytes).await?;
        Ok(temp)
    }
}

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

async fn read_envelope(path: &Path) -> Result<Option<Envelope>, StorageError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Unavailable(e.to_string())),
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn read(&self, collection: &str, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.document_path(collection, key)?;
        Ok(read_envelope(&path).await?.map(|envelope| envelope.document))
    }

    async fn create(
        &self,
        collection: &str,
        key: &str,
        document: &Value,
    ) -> Result<(), StorageError> {
        let path = self.document_path(collection, key)?;
        let dir = self.collection_dir(collection)?;
        let temp = self.write_temp(&dir, key, document).await?;

        let linked = fs::hard_link(&temp, &path).await;
        let _ = fs::remove_file(&temp).await;
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(format!("{}/{}", collection, key)))
            }
            Err(e) => Err(StorageError::Unavailable(e.to_string())),
        }
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        document: &Value,
    ) -> Result<(), StorageError> {
        let path = self.document_path(collection, key)?;
        if fs::metadata(&path).await.is_err() {
            return Err(StorageError::NotFound(format!("{}/{}", collection, key)));
        }
        let dir = self.collection_dir(collection)?;
        let temp = self.write_temp(&dir, key, document).await?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::Unavailable(e.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<bool, StorageError> {
        let path = self.document_path(collection, key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Unavailable(e.to_string())),
        }
    }

    async fn scan(&self, collection: &str) -> Result<Vec<(String, Value)>, StorageError> {
        let dir = self.collection_dir(collection)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Unavailable(e.to_string())),
        };

        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_envelope(&path).await {
                Ok(Some(envelope)) => documents.push((envelope.key, envelope.document)),
                // Deleted between listing and reading
                Ok(None) => {}
                // One bad file must not hide the rest of the collection
                Err(StorageError::Corrupt(e)) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(documents)
    }
}
