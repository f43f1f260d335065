// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Strongbox.
//!
//! Each subsystem has its own error enum; [`StrongboxError`] is the type that
//! crosses crate boundaries and wraps them via `#[from]`.

use thiserror::Error;

/// The primary error type used across all Strongbox traits and operations.
#[derive(Debug, Error)]
pub enum StrongboxError {
    /// Configuration errors (invalid TOML, missing keys, bad key material).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, corrupt rows).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Regeneration(#[from] RegenerationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The credential has no stored version.
    #[error("credential not found: {name}")]
    NotFound { name: String },

    /// The caller supplied a malformed name, type, or value.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StrongboxError {
    /// Wrap any error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Whether retrying the same operation may succeed.
    ///
    /// Only provider outages and storage errors qualify. External backend
    /// writes may not be idempotent, so backend errors are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Encryption(e) => e.is_transient(),
            Self::Storage { .. } => true,
            _ => false,
        }
    }
}

/// Failures raised by encryption providers and the key registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncryptionError {
    /// The registry was configured without any key.
    #[error("no active encryption key is configured")]
    NoActiveKey,

    /// A key id or provider key handle is unknown.
    #[error("encryption key not found: {key}")]
    KeyNotFound { key: String },

    /// The provider could not be reached or refused the request.
    #[error("encryption provider `{provider}` unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    /// Encryption or decryption failed (wrong key, tampered ciphertext).
    #[error("cipher failure: {reason}")]
    CipherFailure { reason: String },
}

impl EncryptionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }
}

/// Failures raised while regenerating credentials.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegenerationError {
    /// The signing graph reachable from the requested root contains a cycle.
    #[error("signing graph contains a cycle: {}", path.join(" -> "))]
    SigningGraphCycle { path: Vec<String> },

    /// The generator could not produce new material for a credential.
    #[error("failed to generate `{name}`: {reason}")]
    GeneratorFailure { name: String, reason: String },

    /// The credential has no prior version to regenerate from.
    #[error("credential not found: {name}")]
    NotFound { name: String },

    /// The latest version was set by a caller and carries no generation parameters.
    #[error("credential `{name}` was not generated and cannot be regenerated")]
    NotRegeneratable { name: String },

    /// A regeneration job was driven through an illegal state change.
    #[error("invalid job transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

/// Failures raised by the external secret backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The backend rejected our credentials or token.
    #[error("backend authentication failed: {0}")]
    AuthenticationFailure(String),

    /// The backend could not be reached or returned an unexpected status.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend cannot store credentials of this type.
    #[error("backend does not support credentials of type `{credential_type}`")]
    UnsupportedType { credential_type: String },

    /// The backend does not implement this operation.
    #[error("backend does not support {operation}")]
    Unsupported { operation: String },
}
