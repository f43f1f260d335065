// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The internal credential repository: encrypted versions in a local store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use strongbox_core::{
    CertificateSummary, CredentialName, CredentialRepository, CredentialVersion,
    CredentialVersionStore, CredentialValue, CredentialView, NewCredential, StrongboxError,
};

use crate::registry::EncryptionKeyRegistry;

/// Encrypts on write with the active key and decrypts on read with whichever
/// key each version records.
pub struct EncryptedCredentialRepository {
    registry: Arc<EncryptionKeyRegistry>,
    store: Arc<dyn CredentialVersionStore>,
}

impl EncryptedCredentialRepository {
    pub fn new(registry: Arc<EncryptionKeyRegistry>, store: Arc<dyn CredentialVersionStore>) -> Self {
        Self { registry, store }
    }

    /// Every version of `name`, newest first, decrypted.
    pub async fn history(&self, name: &CredentialName) -> Result<Vec<CredentialView>, StrongboxError> {
        let mut views = Vec::new();
        for version in self.store.versions(name).await? {
            views.push(self.decrypt(version).await?);
        }
        Ok(views)
    }

    async fn decrypt(&self, version: CredentialVersion) -> Result<CredentialView, StrongboxError> {
        let plaintext = self
            .registry
            .decrypt(version.encryption_key_id, &version.ciphertext, &version.nonce)
            .await?;
        let value = CredentialValue::from_bytes(&plaintext)?;
        Ok(CredentialView {
            id: version.id,
            name: version.name,
            credential_type: version.credential_type,
            value,
            version_created_at: version.created_at,
            metadata: version.metadata,
        })
    }
}

#[async_trait]
impl CredentialRepository for EncryptedCredentialRepository {
    fn backend_name(&self) -> &str {
        "internal"
    }

    async fn append(&self, credential: NewCredential) -> Result<CredentialView, StrongboxError> {
        let plaintext = credential.value.to_bytes()?;
        let (key_id, sealed) = self.registry.encrypt_active(&plaintext).await?;

        let version = CredentialVersion {
            id: Uuid::new_v4(),
            name: credential.name,
            credential_type: credential.value.credential_type(),
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce,
            encryption_key_id: key_id,
            created_at: Utc::now(),
            rotated_at: None,
            metadata: credential.metadata,
        };
        self.store.insert(&version).await?;
        debug!(name = %version.name, version_id = %version.id, key_id = %key_id, "credential version stored");

        Ok(CredentialView {
            id: version.id,
            name: version.name,
            credential_type: version.credential_type,
            value: credential.value,
            version_created_at: version.created_at,
            metadata: version.metadata,
        })
    }

    async fn latest(&self, name: &CredentialName) -> Result<CredentialView, StrongboxError> {
        match self.store.latest(name).await? {
            Some(version) => self.decrypt(version).await,
            None => Err(StrongboxError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<CredentialView, StrongboxError> {
        match self.store.find_by_id(id).await? {
            Some(version) => self.decrypt(version).await,
            None => Err(StrongboxError::NotFound {
                name: id.to_string(),
            }),
        }
    }

    async fn latest_certificates(&self) -> Result<Vec<CertificateSummary>, StrongboxError> {
        // Certificate metadata is stored in the clear; no decryption needed.
        Ok(self
            .store
            .latest_certificates()
            .await?
            .into_iter()
            .filter_map(|version| {
                version.metadata.certificate.map(|metadata| CertificateSummary {
                    name: version.name,
                    version_id: version.id,
                    metadata,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use strongbox_core::{CertificateMetadata, EncryptionError, VersionMetadata};
    use strongbox_test_utils::MemoryStore;

    use super::*;
    use crate::registry::tests::random_registry;

    fn name(raw: &str) -> CredentialName {
        CredentialName::parse(raw).unwrap()
    }

    fn repo(store: &MemoryStore) -> EncryptedCredentialRepository {
        EncryptedCredentialRepository::new(Arc::new(random_registry(2)), Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn stored_ciphertext_is_not_plaintext() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        repo.append(NewCredential::new(
            name("/db/password"),
            CredentialValue::Password("correct-horse".into()),
        ))
        .await
        .unwrap();

        let stored = store.all().await.remove(0);
        let haystack = String::from_utf8_lossy(&stored.ciphertext);
        assert!(!haystack.contains("correct-horse"));
        assert_eq!(stored.nonce.len(), 12);
    }

    #[tokio::test]
    async fn latest_returns_newest_version() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let first = repo
            .append(NewCredential::new(name("/k"), CredentialValue::Value("1".into())))
            .await
            .unwrap();
        repo.append(NewCredential::new(name("/k"), CredentialValue::Value("2".into())))
            .await
            .unwrap();

        assert_eq!(repo.latest(&name("/k")).await.unwrap().value, CredentialValue::Value("2".into()));
        assert_eq!(repo.find_by_id(first.id).await.unwrap().value, CredentialValue::Value("1".into()));

        let history = repo.history(&name("/k")).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].id, first.id);
    }

    #[tokio::test]
    async fn missing_credential_is_not_found() {
        let repo = repo(&MemoryStore::new());
        assert!(matches!(
            repo.latest(&name("/nope")).await,
            Err(StrongboxError::NotFound { .. })
        ));
        assert!(matches!(
            repo.find_by_id(Uuid::new_v4()).await,
            Err(StrongboxError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn foreign_key_version_is_unreadable() {
        let store = MemoryStore::new();
        let writer = EncryptedCredentialRepository::new(Arc::new(random_registry(1)), Arc::new(store.clone()));
        writer
            .append(NewCredential::new(name("/x"), CredentialValue::Value("v".into())))
            .await
            .unwrap();

        let reader = repo(&store);
        let err = reader.latest(&name("/x")).await.unwrap_err();
        assert!(matches!(
            err,
            StrongboxError::Encryption(EncryptionError::KeyNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn certificate_summaries_come_from_metadata() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let metadata = CertificateMetadata {
            subject: "CN=root".into(),
            issuer: "CN=root".into(),
            signer_name: None,
            signer_version_id: None,
            is_ca: true,
            self_signed: true,
            expires_at: Utc::now() + Duration::days(1),
        };
        let view = repo
            .append(
                NewCredential::new(
                    name("/root"),
                    CredentialValue::Certificate {
                        ca: None,
                        certificate: "pem".into(),
                        private_key: "key".into(),
                    },
                )
                .with_metadata(VersionMetadata {
                    generation_parameters: None,
                    certificate: Some(metadata.clone()),
                }),
            )
            .await
            .unwrap();
        repo.append(NewCredential::new(name("/other"), CredentialValue::Value("v".into())))
            .await
            .unwrap();

        let summaries = repo.latest_certificates().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].version_id, view.id);
        assert_eq!(summaries[0].metadata, metadata);
    }
}
