// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Application error types for the token lifecycle core.

/// Application error type surfaced to the UI layer.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No application user is signed in")]
    NotAuthenticated,

    #[error("Account not connected: {0}")]
    AccountNotFound(String),

    #[error("Re-authentication failed for {email}: {cause}")]
    ReauthFailed { email: String, cause: String },

    #[error("Concurrent modification of stored accounts: {0}")]
    Conflict(String),

    #[error("Credential store error: {0}")]
    Persistence(String),

    #[error("Gmail API error: {0}")]
    GmailApi(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Marker used for 401-class Gmail responses, so callers can
    /// distinguish a rejected token from other API failures.
    pub const GMAIL_AUTH_ERROR: &'static str = "gmail_unauthorized";

    /// True when the error means the mail API rejected our credential.
    /// This is the trigger for a forced token refresh.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, AppError::GmailApi(msg) if msg.contains(Self::GMAIL_AUTH_ERROR))
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, AppError>;
