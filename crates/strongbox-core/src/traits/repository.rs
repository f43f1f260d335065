// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plaintext read/write contract shared by the internal and external backends.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StrongboxError;
use crate::types::{CertificateSummary, CredentialName, CredentialView, NewCredential};

/// A credential backend as seen by request handlers and the regeneration engine.
///
/// Implementations own encryption (internal store) or delegate it to a remote
/// service (external vault). Backends are selected once from configuration.
#[async_trait]
pub trait CredentialRepository: Send + Sync + 'static {
    /// Short backend identifier for logs, e.g. `internal` or `external`.
    fn backend_name(&self) -> &str;

    /// Store a new version and return its decrypted view.
    async fn append(&self, credential: NewCredential) -> Result<CredentialView, StrongboxError>;

    /// Latest version of `name`, or [`StrongboxError::NotFound`].
    async fn latest(&self, name: &CredentialName) -> Result<CredentialView, StrongboxError>;

    /// A specific version by id, or [`StrongboxError::NotFound`].
    async fn find_by_id(&self, id: Uuid) -> Result<CredentialView, StrongboxError>;

    /// Latest version facts for every certificate, used to derive signing relationships.
    async fn latest_certificates(&self) -> Result<Vec<CertificateSummary>, StrongboxError>;
}
