//! Identity provider boundary.
//!
//! The interactive popup/consent flow lives in the host application; this
//! crate only sees the `authenticate` call and its outcome. Whatever the
//! underlying provider raises is translated into the crate's closed error
//! set at the broker boundary.

use crate::error::Result;
use async_trait::async_trait;

/// Options for an interactive authentication attempt.
#[derive(Debug, Clone, Default)]
pub struct AuthenticateOptions {
    /// Pre-select this account in the provider's chooser
    pub login_hint: Option<String>,
    /// Force the consent screen so a fresh access token is issued
    pub force_consent: bool,
    /// Force the account chooser even if one account is signed in
    pub force_account_selection: bool,
}

impl AuthenticateOptions {
    /// Options for re-authenticating a specific known account.
    pub fn for_account(email: &str) -> Self {
        Self {
            login_hint: Some(email.to_string()),
            force_consent: true,
            force_account_selection: false,
        }
    }

    /// Options for connecting an additional account.
    pub fn for_new_account() -> Self {
        Self {
            login_hint: None,
            force_consent: false,
            force_account_selection: true,
        }
    }
}

/// The credential and profile returned by a successful interactive flow.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub access_token: String,
}

/// Interactive Google sign-in, implemented by the host application shell.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Run the interactive flow and return the resulting credential.
    ///
    /// Fails when the user cancels consent, the popup is blocked, or the
    /// network is down; the broker surfaces those as `ReauthFailed`.
    async fn authenticate(&self, options: AuthenticateOptions) -> Result<AuthenticatedIdentity>;
}
