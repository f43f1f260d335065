// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use strongbox_config::model::ExternalConfig;
use strongbox_core::{
    BackendError, CertificateSummary, CredentialName, CredentialRepository, CredentialType,
    CredentialValue, CredentialView, NewCredential, StrongboxError, VersionMetadata,
};

use crate::client::{VaultClient, VaultSettings};

pub const EXTERNAL_BACKEND: &str = "external";

/// Stores `value` credentials as vault variables.
///
/// The vault keeps no version identity we can surface, so every view carries
/// the nil UUID.
#[derive(Debug)]
pub struct ExternalCredentialRepository {
    client: VaultClient,
}

impl ExternalCredentialRepository {
    pub fn new(settings: VaultSettings) -> Result<Self, StrongboxError> {
        Ok(Self {
            client: VaultClient::new(settings)?,
        })
    }

    pub fn from_config(config: &ExternalConfig) -> Result<Self, StrongboxError> {
        Self::new(VaultSettings::from_config(config)?)
    }

    fn view(name: CredentialName, value: String) -> CredentialView {
        CredentialView {
            id: Uuid::nil(),
            name,
            credential_type: CredentialType::Value,
            value: CredentialValue::Value(value),
            version_created_at: Utc::now(),
            metadata: VersionMetadata::default(),
        }
    }
}

#[async_trait]
impl CredentialRepository for ExternalCredentialRepository {
    fn backend_name(&self) -> &str {
        EXTERNAL_BACKEND
    }

    async fn append(&self, credential: NewCredential) -> Result<CredentialView, StrongboxError> {
        let credential_type = credential.value.credential_type();
        let CredentialValue::Value(value) = credential.value else {
            return Err(BackendError::UnsupportedType {
                credential_type: credential_type.to_string(),
            }
            .into());
        };

        let variable = credential.name.relative();
        self.client.ensure_variable(variable).await?;
        self.client.set_variable(variable, &value).await?;
        info!(name = %credential.name, policy = %self.client.settings().policy, "credential stored in vault");
        Ok(Self::view(credential.name, value))
    }

    async fn latest(&self, name: &CredentialName) -> Result<CredentialView, StrongboxError> {
        match self.client.get_variable(name.relative()).await? {
            Some(value) => Ok(Self::view(name.clone(), value)),
            None => Err(StrongboxError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<CredentialView, StrongboxError> {
        Err(BackendError::Unsupported {
            operation: "lookup by version id".to_string(),
        }
        .into())
    }

    async fn latest_certificates(&self) -> Result<Vec<CertificateSummary>, StrongboxError> {
        Err(BackendError::Unsupported {
            operation: "certificate indexing".to_string(),
        }
        .into())
    }
}
