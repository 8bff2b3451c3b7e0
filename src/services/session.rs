// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Session controller: binds the application's authentication state to
//! the lifecycle of the account registry and token cache.
//!
//! Registry and broker live inside an explicit [`Session`] context built
//! on sign-in and dropped on sign-out, rather than as ambient globals.

use crate::config::Config;
use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::models::{AppUser, ConnectedAccount};
use crate::services::broker::TokenBroker;
use crate::services::identity::IdentityProvider;
use crate::services::registry::AccountRegistry;
use crate::services::token_cache::TokenCache;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything scoped to one signed-in application user.
pub struct Session {
    pub user: AppUser,
    pub registry: Arc<AccountRegistry>,
    pub broker: Arc<TokenBroker>,
}

/// Observes the application-level authentication signal and owns the
/// current session, the shared token cache, and the injected boundaries.
pub struct SessionController {
    config: Config,
    store: Arc<dyn CredentialStore>,
    identity: Arc<dyn IdentityProvider>,
    cache: TokenCache,
    session: RwLock<Option<Arc<Session>>>,
}

impl SessionController {
    pub fn new(
        config: Config,
        store: Arc<dyn CredentialStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            config,
            store,
            identity,
            cache: TokenCache::new(),
            session: RwLock::new(None),
        }
    }

    /// Handle a transition of the application auth state.
    ///
    /// Signed in: load the user's connected accounts and install a fresh
    /// session. Signed out: clear the token cache and drop the session,
    /// leaving the stored accounts untouched.
    pub async fn handle_auth_change(&self, user: Option<AppUser>) -> Result<()> {
        match user {
            Some(user) => {
                // A direct user-to-user transition must not leak cached
                // tokens from the previous session
                let previous_uid = self
                    .session
                    .read()
                    .await
                    .as_ref()
                    .map(|s| s.user.uid.clone());
                if previous_uid.as_deref().is_some_and(|uid| uid != user.uid) {
                    self.cache.clear();
                }

                let registry = Arc::new(AccountRegistry::new(
                    self.store.clone(),
                    user.uid.clone(),
                ));
                let accounts = registry.load_for_user().await?;

                let broker = Arc::new(TokenBroker::new(
                    self.cache.clone(),
                    self.store.clone(),
                    self.identity.clone(),
                    registry.clone(),
                    user.uid.clone(),
                    self.config.token_buffer(),
                    self.config.token_lease(),
                ));

                tracing::info!(
                    uid = %user.uid,
                    accounts = accounts.len(),
                    "Session started"
                );

                *self.session.write().await = Some(Arc::new(Session {
                    user,
                    registry,
                    broker,
                }));
                Ok(())
            }
            None => {
                self.cache.clear();
                let previous = self.session.write().await.take();
                if let Some(session) = previous {
                    session.registry.clear_local().await;
                    tracing::info!(uid = %session.user.uid, "Session ended");
                }
                Ok(())
            }
        }
    }

    /// The current session, or `NotAuthenticated` when signed out.
    pub async fn session(&self) -> Result<Arc<Session>> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(AppError::NotAuthenticated)
    }

    /// The connected account set the UI observes; empty when signed out.
    pub async fn connected_accounts(&self) -> Vec<ConnectedAccount> {
        match self.session.read().await.as_ref() {
            Some(session) => session.registry.accounts().await,
            None => Vec::new(),
        }
    }

    /// Shared token cache handle (cleared on sign-out).
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }
}
