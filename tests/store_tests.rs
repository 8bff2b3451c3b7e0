// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Tests for compare-and-swap persistence: stale writers conflict instead
//! of silently overwriting, and the registry's retry loop absorbs it.

use mailstack::db::{CredentialStore, MemoryCredentialStore};
use mailstack::error::AppError;
use mailstack::services::AccountRegistry;
use std::sync::Arc;

mod common;
use common::{account, fresh_ms};

#[tokio::test]
async fn test_stale_writer_gets_conflict() {
    let store = MemoryCredentialStore::new();

    // Two readers grab revision 0
    let mut first = store.load("uid-1").await.unwrap();
    let mut second = store.load("uid-1").await.unwrap();

    first.accounts.push(account("a@x.com", "tok-a", fresh_ms(), true));
    assert_eq!(store.save("uid-1", &first).await.unwrap(), 1);

    // The slower writer would drop a@x.com; the revision check stops it
    second.accounts.push(account("b@x.com", "tok-b", fresh_ms(), true));
    let result = store.save("uid-1", &second).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let stored = store.load("uid-1").await.unwrap();
    assert_eq!(stored.accounts.len(), 1);
    assert_eq!(stored.accounts[0].email, "a@x.com");
}

#[tokio::test]
async fn test_registry_retry_absorbs_conflicting_writers() {
    let store = MemoryCredentialStore::new();

    // Two registry instances over the same user, each holding its own
    // (potentially stale) in-memory view
    let first = AccountRegistry::new(Arc::new(store.clone()), "uid-1".to_string());
    let second = AccountRegistry::new(Arc::new(store.clone()), "uid-1".to_string());
    first.load_for_user().await.unwrap();
    second.load_for_user().await.unwrap();

    first
        .add(account("a@x.com", "tok-a", fresh_ms(), false), false)
        .await
        .unwrap();
    // The second registry's view predates the first write; its mutation
    // re-reads before applying, so nothing is lost
    second
        .add(account("b@x.com", "tok-b", fresh_ms(), false), false)
        .await
        .unwrap();

    let stored = store.load("uid-1").await.unwrap();
    let emails: Vec<_> = stored.accounts.iter().map(|a| a.email.as_str()).collect();
    assert_eq!(emails, vec!["a@x.com", "b@x.com"]);
    assert_eq!(
        stored.accounts.iter().filter(|a| a.is_primary).count(),
        1
    );
}
