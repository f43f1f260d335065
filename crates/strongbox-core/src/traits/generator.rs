// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential generator trait.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StrongboxError;
use crate::types::{CertificateMetadata, CredentialName, CredentialValue, GenerationParameters};

/// Certificate and private key of the CA that must sign a generated certificate.
#[derive(Clone)]
pub struct SignerMaterial {
    pub name: CredentialName,
    pub version_id: Uuid,
    pub subject: String,
    pub certificate_pem: String,
    pub private_key_pem: String,
}

impl std::fmt::Debug for SignerMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerMaterial")
            .field("name", &self.name)
            .field("version_id", &self.version_id)
            .field("subject", &self.subject)
            .field("private_key_pem", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub name: CredentialName,
    pub parameters: GenerationParameters,
    pub signer: Option<SignerMaterial>,
}

#[derive(Debug, Clone)]
pub struct GeneratedCredential {
    pub value: CredentialValue,
    /// Present for certificates.
    pub certificate: Option<CertificateMetadata>,
}

/// Produces new credential material from generation parameters.
///
/// Errors should be [`crate::RegenerationError::GeneratorFailure`]; callers
/// wrap anything else into one.
#[async_trait]
pub trait CredentialGenerator: Send + Sync + 'static {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedCredential, StrongboxError>;
}
