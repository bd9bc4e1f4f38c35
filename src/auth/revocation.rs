/// Revocation ledger
///
/// Persistent denylist of tokens, keyed by the full token string in the
/// `revoked_tokens` collection. Each entry remembers when its token expires
/// so the ledger can be compacted: an expired token needs no entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::StorageError;
use crate::store::{self, DocumentStore, REVOKED_TOKENS};

/// How a storage fault is read when it hides a token's revocation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFailurePolicy {
    /// Treat the token as revoked
    FailClosed,
    /// Surface the storage error to the caller
    FailHard,
}

impl StorageFailurePolicy {
    /// Turn the result of a revocation lookup into a revoked/not-revoked answer.
    pub fn resolve(&self, lookup: Result<bool, StorageError>) -> Result<bool, StorageError> {
        match (lookup, self) {
            (Ok(revoked), _) => Ok(revoked),
            (Err(e), StorageFailurePolicy::FailClosed) => {
                tracing::warn!(error = %e, "Revocation lookup failed, treating token as revoked");
                Ok(true)
            }
            (Err(e), StorageFailurePolicy::FailHard) => Err(e),
        }
    }
}

/// Stored per revoked token. Unix timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RevocationEntry {
    pub revoked_at: i64,
    pub expires_at: i64,
}

#[derive(Clone)]
pub struct RevocationLedger {
    store: Arc<dyn DocumentStore>,
}

impl RevocationLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Record a revocation. Revoking twice is fine; the first entry stays.
    pub async fn revoke(
        &self,
        token: &str,
        revoked_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let entry = RevocationEntry {
            revoked_at: revoked_at.timestamp(),
            expires_at: expires_at.timestamp(),
        };
        match store::create_from(self.store.as_ref(), REVOKED_TOKENS, token, &entry).await {
            Ok(()) | Err(StorageError::AlreadyExists(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn is_revoked(&self, token: &str) -> Result<bool, StorageError> {
        Ok(self.store.read(REVOKED_TOKENS, token).await?.is_some())
    }

    /// Delete entries whose tokens have expired. Returns how many went.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let now = now.timestamp();
        let mut purged = 0;

        for (token, document) in self.store.scan(REVOKED_TOKENS).await? {
            let entry: RevocationEntry = match serde_json::from_value(document) {
                Ok(entry) => entry,
                Err(e) => {
                    // Left in place: an unreadable entry still blocks its token
                    tracing::warn!(error = %e, "Skipping unreadable revocation entry");
                    continue;
                }
            };
            if entry.expires_at <= now && self.store.delete(REVOKED_TOKENS, &token).await? {
                purged += 1;
            }
        }

        if purged > 0 {
            tracing::info!(purged, "Purged expired revocation entries");
        }
        Ok(purged)
    }
}
