// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Strongbox.
//!
//! Provides the credential model, the error taxonomy, and the capability
//! traits (encryption provider, version store, repository, generator) that
//! the other workspace crates implement or consume.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{BackendError, EncryptionError, RegenerationError, StrongboxError};
pub use types::{
    CertificateMetadata, CertificateParameters, CertificateSummary, CredentialName,
    CredentialType, CredentialValue, CredentialVersion, CredentialView, EncryptionKey,
    GenerationParameters, KeyAlgorithm, NewCredential, PasswordParameters, UserParameters,
    VersionMetadata,
};

pub use traits::{
    CredentialGenerator, CredentialRepository, CredentialVersionStore, EncryptedValue,
    EncryptionProvider, GeneratedCredential, GenerationRequest, SignerMaterial,
};
