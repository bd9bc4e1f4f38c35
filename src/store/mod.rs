/// Document store
///
/// Collections of JSON documents addressed by key. The auth core and the
/// route handlers only ever talk to `DocumentStore`; the backend is chosen
/// at startup.

mod file;
mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StorageError;

pub use file::FileStore;
pub use memory::MemoryStore;

pub const USERS: &str = "users";
pub const CHECKS: &str = "checks";
pub const REVOKED_TOKENS: &str = "revoked_tokens";

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` when absent.
    async fn read(&self, collection: &str, key: &str) -> Result<Option<Value>, StorageError>;

    /// Insert a new document. Fails with `AlreadyExists` if the key is taken.
    async fn create(&self, collection: &str, key: &str, document: &Value)
        -> Result<(), StorageError>;

    /// Overwrite an existing document. Fails with `NotFound` if absent.
    async fn update(&self, collection: &str, key: &str, document: &Value)
        -> Result<(), StorageError>;

    /// Remove a document. Returns whether anything was removed.
    async fn delete(&self, collection: &str, key: &str) -> Result<bool, StorageError>;

    /// Every `(key, document)` pair in a collection.
    async fn scan(&self, collection: &str) -> Result<Vec<(String, Value)>, StorageError>;
}

/// Fetch and deserialize a document.
pub async fn read_as<T>(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
{
    match store.read(collection, key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Serialize and insert a new document.
pub async fn create_from<T>(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
    document: &T,
) -> Result<(), StorageError>
where
    T: Serialize,
{
    let value = serde_json::to_value(document)?;
    store.create(collection, key, &value).await
}

/// Serialize and overwrite an existing document.
pub async fn update_from<T>(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
    document: &T,
) -> Result<(), StorageError>
where
    T: Serialize,
{
    let value = serde_json::to_value(document)?;
    store.update(collection, key, &value).await
}

/// Keys and collection names must be non-empty and free of NUL bytes.
pub(crate) fn check_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.contains('\0') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
