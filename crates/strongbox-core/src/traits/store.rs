// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for encrypted credential versions.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StrongboxError;
use crate::types::{CredentialName, CredentialVersion};

/// Append-mostly storage of encrypted credential versions.
///
/// Versions are never deleted or overwritten by new writes. The only mutation
/// of an existing row is [`update_in_place`](Self::update_in_place), which is
/// conditioned on the key id the caller last observed.
#[async_trait]
pub trait CredentialVersionStore: Send + Sync + 'static {
    /// Persist a new version.
    async fn insert(&self, version: &CredentialVersion) -> Result<(), StrongboxError>;

    /// The most recently created version of `name`.
    async fn latest(&self, name: &CredentialName) -> Result<Option<CredentialVersion>, StrongboxError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialVersion>, StrongboxError>;

    /// All versions of `name`, newest first.
    async fn versions(&self, name: &CredentialName) -> Result<Vec<CredentialVersion>, StrongboxError>;

    /// Up to `limit` versions not encrypted by `key_id`, ordered by id and
    /// starting strictly after `after`.
    async fn page_not_encrypted_by(
        &self,
        key_id: Uuid,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<CredentialVersion>, StrongboxError>;

    /// Replace the ciphertext of one version if its key id is still
    /// `expected_key_id`. Returns `false` when the row changed concurrently.
    async fn update_in_place(
        &self,
        version_id: Uuid,
        expected_key_id: Uuid,
        ciphertext: &[u8],
        nonce: &[u8],
        new_key_id: Uuid,
    ) -> Result<bool, StrongboxError>;

    /// Number of versions referencing each encryption key id.
    async fn count_by_key(&self) -> Result<HashMap<Uuid, u64>, StrongboxError>;

    /// Latest version of every certificate credential.
    async fn latest_certificates(&self) -> Result<Vec<CredentialVersion>, StrongboxError>;
}
