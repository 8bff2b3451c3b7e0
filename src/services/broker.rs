// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Token broker: returns a currently-valid Gmail access credential for a
//! connected account, re-authenticating through the identity provider
//! when the credential is expired.
//!
//! Lookup order per call:
//! 1. In-memory cache (fast path - no I/O)
//! 2. Credential store entry, if still inside the safety buffer
//! 3. Interactive re-authentication (popup/consent flow)
//!
//! Re-authentication for one email is serialized behind a per-email lock,
//! so concurrent callers for the same expired account await a single
//! consent prompt instead of each opening one.

use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::ConnectedAccount;
use crate::services::identity::{AuthenticateOptions, IdentityProvider};
use crate::services::registry::AccountRegistry;
use crate::services::token_cache::TokenCache;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared per-email re-authentication locks.
pub type ReauthLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

pub struct TokenBroker {
    cache: TokenCache,
    store: Arc<dyn CredentialStore>,
    identity: Arc<dyn IdentityProvider>,
    registry: Arc<AccountRegistry>,
    user_id: String,
    reauth_locks: ReauthLocks,
    /// Margin subtracted from nominal expiry (clock skew + request latency)
    buffer: Duration,
    /// Validity window assigned to freshly issued credentials
    lease: Duration,
}

impl TokenBroker {
    pub fn new(
        cache: TokenCache,
        store: Arc<dyn CredentialStore>,
        identity: Arc<dyn IdentityProvider>,
        registry: Arc<AccountRegistry>,
        user_id: String,
        buffer: Duration,
        lease: Duration,
    ) -> Self {
        Self {
            cache,
            store,
            identity,
            registry,
            user_id,
            reauth_locks: Arc::new(DashMap::new()),
            buffer,
            lease,
        }
    }

    /// Get a valid (non-expired) access credential for the given account.
    ///
    /// Any `Ok` return carries an expiry at least one safety buffer ahead
    /// of now; otherwise the call fails with a typed error.
    pub async fn get_token(&self, email: &str) -> Result<String> {
        if let Some(token) = self.cache.fresh(email, Utc::now(), self.buffer) {
            return Ok(token);
        }

        let lock = self.lock_for(email);
        let _guard = lock.lock().await;

        // Re-check after acquiring the lock: another task may have
        // refreshed while we were waiting.
        if let Some(token) = self.cache.fresh(email, Utc::now(), self.buffer) {
            return Ok(token);
        }

        let doc = self.store.load(&self.user_id).await?;
        let account = doc
            .find(email)
            .ok_or_else(|| AppError::AccountNotFound(email.to_string()))?;

        let now = Utc::now();
        if account.is_fresh(now, self.buffer) {
            let expires_at = expiry_from_millis(account.expires_at, now);
            self.cache.put(email, &account.access_token, expires_at);
            return Ok(account.access_token.clone());
        }

        tracing::info!(email, "Access token expired, re-authenticating");
        self.cache.invalidate(email);
        self.reauthenticate(email).await
    }

    /// Caller-driven refresh that bypasses both cache and store freshness
    /// checks. Used after the Gmail API rejected a credential, which is
    /// the authoritative expiry signal (local and provider clocks may
    /// disagree).
    pub async fn force_refresh(&self, email: &str) -> Result<String> {
        self.cache.invalidate(email);

        let lock = self.lock_for(email);
        let _guard = lock.lock().await;

        let doc = self.store.load(&self.user_id).await?;
        if doc.find(email).is_none() {
            return Err(AppError::AccountNotFound(email.to_string()));
        }

        tracing::info!(email, "Forced token refresh");
        self.reauthenticate(email).await
    }

    /// Run the interactive flow for one account and write the fresh
    /// credential through to cache and store.
    ///
    /// On failure the previous cache entry stays invalidated and the
    /// account list is left untouched, so the next call retries instead
    /// of reusing a token already known to be rejected.
    async fn reauthenticate(&self, email: &str) -> Result<String> {
        let identity = self
            .identity
            .authenticate(AuthenticateOptions::for_account(email))
            .await
            .map_err(|e| match e {
                already @ AppError::ReauthFailed { .. } => already,
                other => AppError::ReauthFailed {
                    email: email.to_string(),
                    cause: other.to_string(),
                },
            })?;

        // The provider may return canonical casing for the address
        let resolved = if identity.email.is_empty() {
            email.to_string()
        } else {
            identity.email.clone()
        };

        let expires_at = Utc::now() + self.lease;
        let account = ConnectedAccount {
            email: resolved.clone(),
            display_name: if identity.display_name.is_empty() {
                resolved.clone()
            } else {
                identity.display_name.clone()
            },
            photo_url: identity.photo_url.clone(),
            access_token: identity.access_token.clone(),
            expires_at: expires_at.timestamp_millis(),
            // Upsert keeps an existing primary flag; a brand-new account
            // only becomes primary if the set was empty
            is_primary: false,
        };

        self.registry.add(account, false).await?;
        self.cache.put(&resolved, &identity.access_token, expires_at);

        tracing::info!(email = %resolved, "Token refreshed and cached");
        Ok(identity.access_token)
    }

    fn lock_for(&self, email: &str) -> Arc<Mutex<()>> {
        self.reauth_locks
            .entry(email.to_ascii_lowercase())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn expiry_from_millis(millis: i64, fallback: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(fallback)
}
