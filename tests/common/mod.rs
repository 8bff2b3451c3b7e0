// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

use async_trait::async_trait;
use chrono::{Duration, Utc};
use mailstack::db::{CredentialStore, MemoryCredentialStore};
use mailstack::error::{AppError, Result};
use mailstack::models::{AccountsDocument, AppUser, ConnectedAccount};
use mailstack::services::{AuthenticateOptions, AuthenticatedIdentity, IdentityProvider};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

#[allow(dead_code)]
pub fn app_user(uid: &str) -> AppUser {
    AppUser {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        display_name: uid.to_string(),
        photo_url: None,
    }
}

#[allow(dead_code)]
pub fn account(email: &str, token: &str, expires_at: i64, is_primary: bool) -> ConnectedAccount {
    ConnectedAccount {
        email: email.to_string(),
        display_name: email.to_string(),
        photo_url: None,
        access_token: token.to_string(),
        expires_at,
        is_primary,
    }
}

/// Expiry comfortably outside the safety buffer.
#[allow(dead_code)]
pub fn fresh_ms() -> i64 {
    (Utc::now() + Duration::hours(1)).timestamp_millis()
}

/// Expiry in the past.
#[allow(dead_code)]
pub fn expired_ms() -> i64 {
    (Utc::now() - Duration::minutes(1)).timestamp_millis()
}

/// Seed the store with an account list for a user.
#[allow(dead_code)]
pub async fn seed(store: &MemoryCredentialStore, uid: &str, accounts: Vec<ConnectedAccount>) {
    let mut doc = store.load(uid).await.unwrap();
    doc.accounts = accounts;
    store.save(uid, &doc).await.unwrap();
}

/// Identity provider fake: hands out sequentially numbered tokens for the
/// hinted account. Can be told to fail, or to stall (simulating a slow
/// consent popup) so concurrency behavior is observable.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeIdentityProvider {
    calls: AtomicUsize,
    fail_with: Option<String>,
    delay_ms: u64,
}

#[allow(dead_code)]
impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(cause: &str) -> Self {
        Self {
            fail_with: Some(cause.to_string()),
            ..Self::default()
        }
    }

    pub fn with_delay(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn authenticate(&self, options: AuthenticateOptions) -> Result<AuthenticatedIdentity> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }

        let email = options
            .login_hint
            .unwrap_or_else(|| "someone@example.com".to_string());

        if let Some(cause) = &self.fail_with {
            return Err(AppError::ReauthFailed {
                email,
                cause: cause.clone(),
            });
        }

        Ok(AuthenticatedIdentity {
            email: email.clone(),
            display_name: email.clone(),
            photo_url: None,
            access_token: format!("fresh-token-{}", n),
        })
    }
}

/// Store wrapper that counts operations and can be told to reject writes.
#[allow(dead_code)]
pub struct InstrumentedStore {
    inner: MemoryCredentialStore,
    pub loads: AtomicUsize,
    pub saves: AtomicUsize,
    pub fail_saves: AtomicBool,
}

#[allow(dead_code)]
impl InstrumentedStore {
    pub fn wrapping(inner: MemoryCredentialStore) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for InstrumentedStore {
    async fn load(&self, user_id: &str) -> Result<AccountsDocument> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(user_id).await
    }

    async fn save(&self, user_id: &str, doc: &AccountsDocument) -> Result<u64> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("injected write failure".to_string()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(user_id, doc).await
    }
}
