// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encryption at rest for Strongbox.
//!
//! - [`crypto`]: AES-256-GCM seal/open via `ring`
//! - [`kdf`]: Argon2id derivation of keys from configured passwords
//! - [`internal`]: the built-in provider holding derived keys
//! - [`registry`]: the ordered key table; first key active, rest retired
//! - [`rotation`]: background re-encryption under the active key
//! - [`usage`]: version counts by key status
//! - [`repository`]: the internal encrypted `CredentialRepository`

pub mod crypto;
pub mod internal;
pub mod kdf;
pub mod registry;
pub mod repository;
pub mod rotation;
pub mod usage;

pub use internal::InternalProvider;
pub use registry::{EncryptionKeyRegistry, KeySource};
pub use repository::EncryptedCredentialRepository;
pub use rotation::{KeyRotationCoordinator, PageFailure, RotationFailure, RotationReport, RotationSettings};
pub use usage::KeyUsage;
