// SPDX-License-Identifier: MIT
// Copyright 2026 Mailstack Developers

//! Data models for the application.

pub mod account;

pub use account::{AccountsDocument, AppUser, ConnectedAccount};
