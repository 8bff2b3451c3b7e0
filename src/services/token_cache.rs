// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Process-local token cache.
//!
//! A volatile view over the credential store: safe to drop at any time at
//! the cost of one extra store read. Keyed by lowercased account email.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Cached access token with expiry information.
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Shared in-memory token cache. Cheap to clone; all clones share entries.
#[derive(Clone, Default)]
pub struct TokenCache {
    entries: Arc<DashMap<String, CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(email: &str) -> String {
        email.to_ascii_lowercase()
    }

    pub fn get(&self, email: &str) -> Option<CachedToken> {
        self.entries.get(&Self::key(email)).map(|e| e.clone())
    }

    pub fn put(&self, email: &str, access_token: &str, expires_at: DateTime<Utc>) {
        self.entries.insert(
            Self::key(email),
            CachedToken {
                access_token: access_token.to_string(),
                expires_at,
            },
        );
    }

    /// Remove one entry (used before a forced refresh).
    pub fn invalidate(&self, email: &str) {
        self.entries.remove(&Self::key(email));
    }

    /// Remove all entries (used on sign-out).
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Return the cached token only if it is still valid `buffer` ahead
    /// of `now`.
    pub fn fresh(&self, email: &str, now: DateTime<Utc>, buffer: Duration) -> Option<String> {
        let cached = self.get(email)?;
        if now + buffer < cached.expires_at {
            Some(cached.access_token)
        } else {
            None
        }
    }
}
