// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Firestore-backed credential store.
//!
//! One document per application user, holding the full connected account
//! list plus a revision counter. Writes go through a transaction so a
//! concurrent writer is detected instead of silently overwritten.

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::AccountsDocument;
use async_trait::async_trait;

/// Firestore credential store client.
#[derive(Clone)]
pub struct FirestoreCredentialStore {
    client: Option<firestore::FirestoreDb>,
    collection: String,
}

impl FirestoreCredentialStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, collection: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, collection).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            collection: collection.to_string(),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str, collection: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without
        // needing a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Persistence(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            collection: collection.to_string(),
        })
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All store operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            collection: crate::db::collections::USER_ACCOUNTS.to_string(),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::Persistence("Credential store not connected (offline mode)".to_string())
        })
    }
}

#[async_trait]
impl CredentialStore for FirestoreCredentialStore {
    async fn load(&self, user_id: &str) -> Result<AccountsDocument, AppError> {
        let doc: Option<AccountsDocument> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(&self.collection)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        // NotFound is treated as an empty account set
        Ok(doc.unwrap_or_default())
    }

    async fn save(&self, user_id: &str, doc: &AccountsDocument) -> Result<u64, AppError> {
        let client = self.get_client()?;

        // Begin a transaction; reading the document inside it registers
        // the document for conflict detection on commit.
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to begin transaction: {}", e)))?;

        let current: Option<AccountsDocument> = client
            .fluent()
            .select()
            .by_id_in(&self.collection)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| {
                AppError::Persistence(format!("Failed to read accounts in transaction: {}", e))
            })?;

        let current_revision = current.map(|d| d.revision).unwrap_or(0);
        if current_revision != doc.revision {
            let _ = transaction.rollback().await;
            return Err(AppError::Conflict(format!(
                "expected revision {}, found {}",
                doc.revision, current_revision
            )));
        }

        let next = AccountsDocument {
            accounts: doc.accounts.clone(),
            revision: doc.revision + 1,
        };

        client
            .fluent()
            .update()
            .in_col(&self.collection)
            .document_id(user_id)
            .object(&next)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Persistence(format!("Failed to add accounts write to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Persistence(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(
            user_id,
            accounts = next.accounts.len(),
            revision = next.revision,
            "Accounts document saved"
        );

        Ok(next.revision)
    }
}
