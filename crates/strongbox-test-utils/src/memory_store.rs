// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `CredentialVersionStore`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use strongbox_core::{
    CredentialName, CredentialType, CredentialVersion, CredentialVersionStore, StrongboxError,
};

/// Versions kept in insertion order; `latest` is the last inserted for a name.
#[derive(Clone, Default)]
pub struct MemoryStore {
    versions: Arc<Mutex<Vec<CredentialVersion>>>,
    updates: Arc<Mutex<u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `update_in_place` calls so far.
    pub async fn update_count(&self) -> u64 {
        *self.updates.lock().await
    }

    /// Snapshot of every stored version.
    pub async fn all(&self) -> Vec<CredentialVersion> {
        self.versions.lock().await.clone()
    }
}

#[async_trait]
impl CredentialVersionStore for MemoryStore {
    async fn insert(&self, version: &CredentialVersion) -> Result<(), StrongboxError> {
        let mut versions = self.versions.lock().await;
        if versions.iter().any(|v| v.id == version.id) {
            return Err(StrongboxError::Internal(format!(
                "duplicate version id {}",
                version.id
            )));
        }
        versions.push(version.clone());
        Ok(())
    }

    async fn latest(
        &self,
        name: &CredentialName,
    ) -> Result<Option<CredentialVersion>, StrongboxError> {
        let versions = self.versions.lock().await;
        Ok(versions.iter().rev().find(|v| &v.name == name).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialVersion>, StrongboxError> {
        let versions = self.versions.lock().await;
        Ok(versions.iter().find(|v| v.id == id).cloned())
    }

    async fn versions(&self, name: &CredentialName) -> Result<Vec<CredentialVersion>, StrongboxError> {
        let versions = self.versions.lock().await;
        Ok(versions
            .iter()
            .rev()
            .filter(|v| &v.name == name)
            .cloned()
            .collect())
    }

    async fn page_not_encrypted_by(
        &self,
        key_id: Uuid,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<CredentialVersion>, StrongboxError> {
        let versions = self.versions.lock().await;
        let mut page: Vec<CredentialVersion> = versions
            .iter()
            .filter(|v| v.encryption_key_id != key_id)
            .filter(|v| after.is_none_or(|a| v.id > a))
            .cloned()
            .collect();
        page.sort_by_key(|v| v.id);
        page.truncate(limit);
        Ok(page)
    }

    async fn update_in_place(
        &self,
        version_id: Uuid,
        expected_key_id: Uuid,
        ciphertext: &[u8],
        nonce: &[u8],
        new_key_id: Uuid,
    ) -> Result<bool, StrongboxError> {
        let mut versions = self.versions.lock().await;
        let Some(version) = versions
            .iter_mut()
            .find(|v| v.id == version_id && v.encryption_key_id == expected_key_id)
        else {
            return Ok(false);
        };
        version.ciphertext = ciphertext.to_vec();
        version.nonce = nonce.to_vec();
        version.encryption_key_id = new_key_id;
        version.rotated_at = Some(Utc::now());
        *self.updates.lock().await += 1;
        Ok(true)
    }

    async fn count_by_key(&self) -> Result<HashMap<Uuid, u64>, StrongboxError> {
        let versions = self.versions.lock().await;
        let mut counts = HashMap::new();
        for v in versions.iter() {
            *counts.entry(v.encryption_key_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn latest_certificates(&self) -> Result<Vec<CredentialVersion>, StrongboxError> {
        let versions = self.versions.lock().await;
        let mut latest: HashMap<&CredentialName, &CredentialVersion> = HashMap::new();
        for v in versions.iter() {
            latest.insert(&v.name, v);
        }
        let mut certs: Vec<CredentialVersion> = latest
            .into_values()
            .filter(|v| v.credential_type == CredentialType::Certificate)
            .cloned()
            .collect();
        certs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(certs)
    }
}
