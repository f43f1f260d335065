// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability traits at the seams between Strongbox components.
//!
//! All traits use `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` and selected at configuration time.

pub mod generator;
pub mod provider;
pub mod repository;
pub mod store;

pub use generator::{CredentialGenerator, GeneratedCredential, GenerationRequest, SignerMaterial};
pub use provider::{EncryptedValue, EncryptionProvider};
pub use repository::CredentialRepository;
pub use store::CredentialVersionStore;
