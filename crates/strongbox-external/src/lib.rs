// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External secret vault backend for Strongbox.
//!
//! Implements [`strongbox_core::CredentialRepository`] over the vault's HTTP
//! API so the rest of the system can switch backends through configuration.

pub mod client;
pub mod repository;
pub mod token;

pub use client::{VaultClient, VaultSettings};
pub use repository::{EXTERNAL_BACKEND, ExternalCredentialRepository};
pub use token::CachedToken;
