//! Application configuration loaded from environment variables.
//!
//! The OAuth client id is consumed by the host application's popup flow;
//! the token lifecycle tunables feed the broker directly.

use std::env;

/// Default margin subtracted from a credential's nominal expiry (seconds).
pub const DEFAULT_TOKEN_BUFFER_SECS: i64 = 2 * 60;

/// Default lease window assigned to freshly issued credentials (minutes).
/// Deliberately shorter than Google's real ~60 minute token lifetime.
pub const DEFAULT_TOKEN_LEASE_MINUTES: i64 = 55;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// GCP project ID for the Firestore credential store
    pub gcp_project_id: String,
    /// Firestore collection holding per-user connected account documents
    pub accounts_collection: String,
    /// Expiry safety buffer in seconds
    pub token_buffer_secs: i64,
    /// Lease window in minutes for freshly issued tokens
    pub token_lease_minutes: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            accounts_collection: env::var("ACCOUNTS_COLLECTION")
                .unwrap_or_else(|_| crate::db::collections::USER_ACCOUNTS.to_string()),
            token_buffer_secs: env::var("TOKEN_BUFFER_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TOKEN_BUFFER_SECS),
            token_lease_minutes: env::var("TOKEN_LEASE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TOKEN_LEASE_MINUTES),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test_client_id".to_string(),
            gcp_project_id: "test-project".to_string(),
            accounts_collection: crate::db::collections::USER_ACCOUNTS.to_string(),
            token_buffer_secs: DEFAULT_TOKEN_BUFFER_SECS,
            token_lease_minutes: DEFAULT_TOKEN_LEASE_MINUTES,
        }
    }

    /// Expiry safety buffer as a chrono duration.
    pub fn token_buffer(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_buffer_secs)
    }

    /// Token lease window as a chrono duration.
    pub fn token_lease(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_lease_minutes)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
