// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Mailstack: multi-account Gmail token lifecycle core.
//!
//! This crate manages the access credentials of multiple connected Google
//! identities under one signed-in application user: acquiring, caching,
//! persisting, expiring, and refreshing per-account Gmail tokens. The UI
//! shell, the interactive consent popup, and the document database are
//! external collaborators behind the boundaries in [`services::identity`]
//! and [`db`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::{AppError, Result};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured JSON logging for the host application.
///
/// # Panics
/// Panics if called more than once per process.
pub fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mailstack=debug".parse().expect("static directive"))
                .add_directive("info".parse().expect("static directive")),
        )
        .with(format)
        .init();
}
