// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Services module - token lifecycle and mail boundary logic.

pub mod broker;
pub mod gmail;
pub mod identity;
pub mod registry;
pub mod session;
pub mod token_cache;

pub use broker::TokenBroker;
pub use gmail::{GmailClient, GmailService, MessageSummary};
pub use identity::{AuthenticateOptions, AuthenticatedIdentity, IdentityProvider};
pub use registry::AccountRegistry;
pub use session::{Session, SessionController};
pub use token_cache::{CachedToken, TokenCache};
