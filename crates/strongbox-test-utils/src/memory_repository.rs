// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plaintext in-memory `CredentialRepository`.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use strongbox_core::{
    CertificateSummary, CredentialName, CredentialRepository, CredentialView, NewCredential,
    StrongboxError,
};

/// Stores views directly; no encryption involved.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    views: Arc<Mutex<Vec<CredentialView>>>,
    fail_appends: Arc<Mutex<HashSet<CredentialName>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `append` for `name` fail with a storage error.
    pub async fn fail_appends_for(&self, name: &CredentialName) {
        self.fail_appends.lock().await.insert(name.clone());
    }

    /// Every version of `name`, oldest first.
    pub async fn history(&self, name: &CredentialName) -> Vec<CredentialView> {
        self.views
            .lock()
            .await
            .iter()
            .filter(|v| &v.name == name)
            .cloned()
            .collect()
    }

    /// Total versions across all names.
    pub async fn version_count(&self) -> usize {
        self.views.lock().await.len()
    }
}

#[async_trait]
impl CredentialRepository for MemoryRepository {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn append(&self, credential: NewCredential) -> Result<CredentialView, StrongboxError> {
        if self.fail_appends.lock().await.contains(&credential.name) {
            return Err(StrongboxError::storage(std::io::Error::other(format!(
                "append rejected for {}",
                credential.name
            ))));
        }
        let view = CredentialView {
            id: Uuid::new_v4(),
            credential_type: credential.value.credential_type(),
            name: credential.name,
            value: credential.value,
            version_created_at: Utc::now(),
            metadata: credential.metadata,
        };
        self.views.lock().await.push(view.clone());
        Ok(view)
    }

    async fn latest(&self, name: &CredentialName) -> Result<CredentialView, StrongboxError> {
        self.views
            .lock()
            .await
            .iter()
            .rev()
            .find(|v| &v.name == name)
            .cloned()
            .ok_or_else(|| StrongboxError::NotFound {
                name: name.to_string(),
            })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<CredentialView, StrongboxError> {
        self.views
            .lock()
            .await
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| StrongboxError::NotFound {
                name: id.to_string(),
            })
    }

    async fn latest_certificates(&self) -> Result<Vec<CertificateSummary>, StrongboxError> {
        let views = self.views.lock().await;
        let mut latest: BTreeMap<&CredentialName, &CredentialView> = BTreeMap::new();
        for view in views.iter() {
            latest.insert(&view.name, view);
        }
        Ok(latest
            .into_values()
            .filter_map(|view| {
                view.metadata
                    .certificate
                    .as_ref()
                    .map(|metadata| CertificateSummary {
                        name: view.name.clone(),
                        version_id: view.id,
                        metadata: metadata.clone(),
                    })
            })
            .collect())
    }
}
