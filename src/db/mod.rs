//! Credential store layer (Firestore in production, in-memory for tests
//! and session-only hosts).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreCredentialStore;
pub use memory::MemoryCredentialStore;

use crate::error::Result;
use crate::models::AccountsDocument;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Per-user connected account documents (keyed by application user id)
    pub const USER_ACCOUNTS: &str = "user_accounts";
}

/// Persistence boundary for per-user connected account documents.
///
/// All higher layers read-modify-write the full document; `save` is a
/// compare-and-swap on the document's revision so a stale writer fails
/// with [`crate::AppError::Conflict`] instead of silently overwriting.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the accounts document for a user. A missing record is not an
    /// error: it yields an empty document with revision 0.
    async fn load(&self, user_id: &str) -> Result<AccountsDocument>;

    /// Replace the accounts document. `doc.revision` must be the revision
    /// the caller read; the store persists `revision + 1` and returns it.
    async fn save(&self, user_id: &str, doc: &AccountsDocument) -> Result<u64>;
}
