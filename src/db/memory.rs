//! In-memory credential store.
//!
//! Used by the test suite and by hosts that want session-only persistence
//! (connected accounts are forgotten when the process exits).

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::AccountsDocument;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Credential store backed by a process-local map.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    docs: Arc<DashMap<String, AccountsDocument>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self, user_id: &str) -> Result<AccountsDocument, AppError> {
        Ok(self
            .docs
            .get(user_id)
            .map(|d| d.clone())
            .unwrap_or_default())
    }

    async fn save(&self, user_id: &str, doc: &AccountsDocument) -> Result<u64, AppError> {
        // entry() holds the shard lock, making the revision check and the
        // replacement a single atomic step.
        let mut entry = self.docs.entry(user_id.to_string()).or_default();
        if entry.revision != doc.revision {
            return Err(AppError::Conflict(format!(
                "expected revision {}, found {}",
                doc.revision, entry.revision
            )));
        }

        let next_revision = doc.revision + 1;
        *entry = AccountsDocument {
            accounts: doc.accounts.clone(),
            revision: next_revision,
        };
        Ok(next_revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConnectedAccount;

    fn account(email: &str) -> ConnectedAccount {
        ConnectedAccount {
            email: email.to_string(),
            display_name: email.to_string(),
            photo_url: None,
            access_token: "tok".to_string(),
            expires_at: 0,
            is_primary: true,
        }
    }

    #[tokio::test]
    async fn test_missing_user_loads_empty() {
        let store = MemoryCredentialStore::new();
        let doc = store.load("nobody").await.unwrap();
        assert!(doc.accounts.is_empty());
        assert_eq!(doc.revision, 0);
    }

    #[tokio::test]
    async fn test_stale_revision_conflicts() {
        let store = MemoryCredentialStore::new();

        let mut doc = store.load("uid-1").await.unwrap();
        doc.accounts.push(account("a@x.com"));
        let rev = store.save("uid-1", &doc).await.unwrap();
        assert_eq!(rev, 1);

        // Writing again with the already-consumed revision must fail
        let result = store.save("uid-1", &doc).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // A fresh read-modify-write succeeds
        let mut doc = store.load("uid-1").await.unwrap();
        doc.accounts.push(account("b@x.com"));
        assert_eq!(store.save("uid-1", &doc).await.unwrap(), 2);
    }
}
