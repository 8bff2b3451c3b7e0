// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Connected account registry for the signed-in application user.
//!
//! Holds the in-memory account set the UI observes and persists every
//! mutation as a full-list replace through the credential store. Writes
//! use a bounded compare-and-swap retry loop, so two mutations racing on
//! the same user cannot silently drop each other.

use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::{AccountsDocument, ConnectedAccount};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Attempts for a read-modify-write before giving up on conflicts.
const SAVE_ATTEMPTS: u32 = 3;

/// The set of connected identities for one application user, with exactly
/// one marked primary whenever the set is non-empty.
pub struct AccountRegistry {
    store: Arc<dyn CredentialStore>,
    user_id: String,
    /// Last-known-good view; never corrupted by a failed write.
    inner: RwLock<AccountsDocument>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn CredentialStore>, user_id: String) -> Self {
        Self {
            store,
            user_id,
            inner: RwLock::new(AccountsDocument::default()),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Read the account list from the credential store and replace the
    /// in-memory set. Called on sign-in and whenever the UI needs a
    /// refreshed view.
    pub async fn load_for_user(&self) -> Result<Vec<ConnectedAccount>> {
        let doc = self.store.load(&self.user_id).await?;
        let accounts = doc.accounts.clone();
        *self.inner.write().await = doc;
        tracing::debug!(
            user_id = %self.user_id,
            count = accounts.len(),
            "Connected accounts loaded"
        );
        Ok(accounts)
    }

    /// Snapshot of the in-memory account set.
    pub async fn accounts(&self) -> Vec<ConnectedAccount> {
        self.inner.read().await.accounts.clone()
    }

    /// The current primary account, if any.
    pub async fn primary(&self) -> Option<ConnectedAccount> {
        self.inner.read().await.primary().cloned()
    }

    /// Drop the in-memory set without touching the store (sign-out path).
    pub async fn clear_local(&self) {
        *self.inner.write().await = AccountsDocument::default();
    }

    /// Add a connected account, or re-link it if the email already exists
    /// (credential and profile overwritten in place, never duplicated).
    ///
    /// The first account added to an empty set becomes primary; a newly
    /// added secondary never steals the primary flag unless `make_primary`
    /// is requested explicitly.
    pub async fn add(
        &self,
        account: ConnectedAccount,
        make_primary: bool,
    ) -> Result<Vec<ConnectedAccount>> {
        let email = account.email.clone();
        let accounts = self
            .mutate(move |list| {
                upsert(list, account.clone(), make_primary);
                true
            })
            .await?;
        tracing::info!(email = %email, make_primary, "Connected account upserted");
        Ok(accounts)
    }

    /// Remove a connected account. If the removed entry was primary and
    /// others remain, the first remaining account is promoted. Unknown
    /// emails are a no-op.
    pub async fn remove(&self, email: &str) -> Result<Vec<ConnectedAccount>> {
        let target = email.to_string();
        let accounts = self
            .mutate(move |list| {
                let Some(pos) = list.iter().position(|a| a.matches(&target)) else {
                    return false;
                };
                let was_primary = list.remove(pos).is_primary;
                if was_primary {
                    if let Some(first) = list.first_mut() {
                        first.is_primary = true;
                    }
                }
                true
            })
            .await?;
        tracing::info!(email, "Connected account removed");
        Ok(accounts)
    }

    /// Make the matching account primary and demote all others. Unknown
    /// emails are a silent no-op.
    pub async fn switch_primary(&self, email: &str) -> Result<Vec<ConnectedAccount>> {
        let target = email.to_string();
        self.mutate(move |list| {
            if !list.iter().any(|a| a.matches(&target)) {
                return false;
            }
            for account in list.iter_mut() {
                account.is_primary = account.matches(&target);
            }
            true
        })
        .await
    }

    /// Read-modify-write the stored document with CAS retries. `apply`
    /// returns false for defined no-ops, which skip the store write.
    async fn mutate<F>(&self, apply: F) -> Result<Vec<ConnectedAccount>>
    where
        F: Fn(&mut Vec<ConnectedAccount>) -> bool,
    {
        let mut last_conflict = String::new();

        for attempt in 0..SAVE_ATTEMPTS {
            let mut doc = self.store.load(&self.user_id).await?;

            if !apply(&mut doc.accounts) {
                // No-op by design; still refresh the local view
                let accounts = doc.accounts.clone();
                *self.inner.write().await = doc;
                return Ok(accounts);
            }

            match self.store.save(&self.user_id, &doc).await {
                Ok(revision) => {
                    doc.revision = revision;
                    let accounts = doc.accounts.clone();
                    *self.inner.write().await = doc;
                    return Ok(accounts);
                }
                Err(AppError::Conflict(detail)) => {
                    tracing::debug!(
                        user_id = %self.user_id,
                        attempt,
                        detail = %detail,
                        "Accounts write conflicted, retrying"
                    );
                    last_conflict = detail;
                }
                // Other failures leave the in-memory set as last-known-good
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict(last_conflict))
    }
}

/// Upsert semantics shared by first sign-in, add-account, and the broker's
/// token write-through.
fn upsert(list: &mut Vec<ConnectedAccount>, mut incoming: ConnectedAccount, make_primary: bool) {
    if let Some(pos) = list.iter().position(|a| a.matches(&incoming.email)) {
        // Re-link: overwrite credential and profile, keep the primary flag
        incoming.is_primary = list[pos].is_primary || make_primary;
        list[pos] = incoming;
        if make_primary {
            for (i, account) in list.iter_mut().enumerate() {
                if i != pos {
                    account.is_primary = false;
                }
            }
        }
    } else {
        let had_primary = list.iter().any(|a| a.is_primary);
        incoming.is_primary = make_primary || !had_primary;
        if make_primary {
            for account in list.iter_mut() {
                account.is_primary = false;
            }
        }
        list.push(incoming);
    }
}
