//! Account models for storage and the session layer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in application user (one at a time).
#[derive(Debug, Clone)]
pub struct AppUser {
    /// Stable identifier, also the credential store document ID
    pub uid: String,
    /// Sign-in email address
    pub email: String,
    /// Display name
    pub display_name: String,
    /// Profile picture URL
    pub photo_url: Option<String>,
}

/// A connected Google identity with its current access credential.
///
/// Stored in Firestore as part of the per-user accounts document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedAccount {
    /// Email address, the unique key within a user's account set
    pub email: String,
    /// Display name
    pub display_name: String,
    /// Profile picture URL (may be absent)
    pub photo_url: Option<String>,
    /// Current Gmail access credential (bearer token)
    pub access_token: String,
    /// When the credential expires (epoch milliseconds)
    pub expires_at: i64,
    /// Whether this is the primary account for single-account UI actions
    pub is_primary: bool,
}

impl ConnectedAccount {
    /// True if the credential is still valid `buffer` ahead of `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        (now + buffer).timestamp_millis() < self.expires_at
    }

    /// Emails are compared case-insensitively everywhere.
    pub fn matches(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

/// The persisted per-user document: the full connected account list plus a
/// revision counter for compare-and-swap writes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsDocument {
    pub accounts: Vec<ConnectedAccount>,
    /// Incremented on every successful save; a stale revision on write
    /// means another writer got there first.
    #[serde(default)]
    pub revision: u64,
}

impl AccountsDocument {
    /// Find an account by email (case-insensitive).
    pub fn find(&self, email: &str) -> Option<&ConnectedAccount> {
        self.accounts.iter().find(|a| a.matches(email))
    }

    /// The primary account, if the set is non-empty.
    pub fn primary(&self) -> Option<&ConnectedAccount> {
        self.accounts.iter().find(|a| a.is_primary)
    }
}
