// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires configuration into a backend, a regeneration engine, and (for the
//! internal backend) a rotation coordinator.

use std::sync::Arc;

use tracing::{debug, info, warn};

use strongbox_config::model::{BackendKind, StrongboxConfig};
use strongbox_core::{CredentialRepository, StrongboxError};
use strongbox_encryption::{
    EncryptedCredentialRepository, EncryptionKeyRegistry, KeyRotationCoordinator,
    RotationSettings,
};
use strongbox_external::ExternalCredentialRepository;
use strongbox_generate::DefaultCredentialGenerator;
use strongbox_regenerate::CertificateRegenerationEngine;
use strongbox_storage::SqliteVersionStore;

pub struct Services {
    pub repository: Arc<dyn CredentialRepository>,
    pub engine: CertificateRegenerationEngine,
    pub registry: Option<Arc<EncryptionKeyRegistry>>,
    rotation: Option<KeyRotationCoordinator>,
    store: Option<Arc<SqliteVersionStore>>,
}

impl Services {
    pub async fn build(config: &StrongboxConfig) -> Result<Self, StrongboxError> {
        match config.backend.kind {
            BackendKind::Internal => Self::internal(config).await,
            BackendKind::External => Self::external(config),
        }
    }

    async fn internal(config: &StrongboxConfig) -> Result<Self, StrongboxError> {
        let encryption = config.encryption.clone();
        let registry = tokio::task::spawn_blocking(move || {
            EncryptionKeyRegistry::from_config(&encryption)
        })
        .await
        .map_err(|e| StrongboxError::Internal(format!("key derivation task failed: {e}")))??;
        registry.active_key()?;
        let registry = Arc::new(registry);

        let store = Arc::new(SqliteVersionStore::open(&config.storage).await?);
        let repository: Arc<dyn CredentialRepository> = Arc::new(
            EncryptedCredentialRepository::new(registry.clone(), store.clone()),
        );
        let rotation = KeyRotationCoordinator::new(
            registry.clone(),
            store.clone(),
            RotationSettings::from(&config.rotation),
        );

        let usage = rotation.key_usage().await?;
        if usage.inactive_keys > 0 {
            warn!(
                versions = usage.inactive_keys,
                "versions are still encrypted with retired keys; run `strongbox rotate`"
            );
        }
        info!(
            backend = repository.backend_name(),
            database = %config.storage.database_path,
            keys = registry.all_keys().count(),
            "credential store ready"
        );

        Ok(Self {
            engine: Self::engine(repository.clone()),
            repository,
            registry: Some(registry),
            rotation: Some(rotation),
            store: Some(store),
        })
    }

    fn external(config: &StrongboxConfig) -> Result<Self, StrongboxError> {
        let repository: Arc<dyn CredentialRepository> =
            Arc::new(ExternalCredentialRepository::from_config(&config.external)?);
        info!(backend = repository.backend_name(), "credential store ready");
        Ok(Self {
            engine: Self::engine(repository.clone()),
            repository,
            registry: None,
            rotation: None,
            store: None,
        })
    }

    fn engine(repository: Arc<dyn CredentialRepository>) -> CertificateRegenerationEngine {
        CertificateRegenerationEngine::new(repository, Arc::new(DefaultCredentialGenerator::new()))
    }

    /// The rotation coordinator, which only the internal backend has.
    pub fn rotation(&self) -> Result<&KeyRotationCoordinator, StrongboxError> {
        self.rotation.as_ref().ok_or_else(|| {
            StrongboxError::Config(
                "key rotation requires backend.kind = \"internal\"".to_string(),
            )
        })
    }

    /// Drop every handle on the store and checkpoint its WAL.
    pub async fn shutdown(self) -> Result<(), StrongboxError> {
        let Self {
            repository,
            engine,
            rotation,
            store,
            ..
        } = self;
        drop(engine);
        drop(repository);
        drop(rotation);

        if let Some(store) = store {
            match Arc::try_unwrap(store) {
                Ok(store) => store.close().await?,
                Err(_) => debug!("store still shared at shutdown, skipping checkpoint"),
            }
        }
        Ok(())
    }
}
