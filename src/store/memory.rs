use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{check_key, DocumentStore};
use crate::error::StorageError;

type Collections = HashMap<String, HashMap<String, Value>>;

/// In-process document store
///
/// Holds everything in a mutex-guarded map. Used by the test suites and for
/// throwaway local runs (`storage.backend = "memory"`).
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StorageError> {
        self.collections
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn read(&self, collection: &str, key: &str) -> Result<Option<Value>, StorageError> {
        check_key(collection)?;
        check_key(key)?;
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(key))
            .cloned())
    }

    async fn create(
        &self,
        collection: &str,
        key: &str,
        document: &Value,
    ) -> Result<(), StorageError> {
        check_key(collection)?;
        check_key(key)?;
        let mut collections = self.lock()?;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.contains_key(key) {
            return Err(StorageError::AlreadyExists(format!("{}/{}", collection, key)));
        }
        documents.insert(key.to_string(), document.clone());
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        key: &str,
        document: &Value,
    ) -> Result<(), StorageError> {
        check_key(collection)?;
        check_key(key)?;
        let mut collections = self.lock()?;
        match collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(key))
        {
            Some(existing) => {
                *existing = document.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("{}/{}", collection, key))),
        }
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<bool, StorageError> {
        check_key(collection)?;
        check_key(key)?;
        let mut collections = self.lock()?;
        Ok(collections
            .get_mut(collection)
            .map(|documents| documents.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn scan(&self, collection: &str) -> Result<Vec<(String, Value)>, StorageError> {
        check_key(collection)?;
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
