// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic `CredentialGenerator` for engine tests.
//!
//! Produces placeholder material instead of real keys, but fills in
//! certificate metadata (subject, issuer, signer version) exactly as the real
//! generator does, so signing-graph behaviour can be tested without rcgen.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use strongbox_core::{
    CertificateMetadata, CredentialGenerator, CredentialName, CredentialValue,
    GeneratedCredential, GenerationParameters, GenerationRequest, RegenerationError,
    StrongboxError,
};

#[derive(Clone, Default)]
pub struct MockGenerator {
    failures: Arc<Mutex<HashSet<CredentialName>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    cancel_after: Arc<Mutex<Option<(CredentialName, CancellationToken)>>>,
    counter: Arc<AtomicU64>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make generation of `name` fail until further notice.
    pub async fn fail_for(&self, name: &CredentialName) {
        self.failures.lock().await.insert(name.clone());
    }

    /// Cancel `token` once `name` has been generated successfully.
    pub async fn cancel_after(&self, name: &CredentialName, token: CancellationToken) {
        *self.cancel_after.lock().await = Some((name.clone(), token));
    }

    /// Requests seen so far, in call order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

/// Distinguished name string as written by the generators.
pub fn subject_for(common_name: &str, organization: Option<&str>) -> String {
    match organization {
        Some(org) => format!("CN={common_name},O={org}"),
        None => format!("CN={common_name}"),
    }
}

#[async_trait]
impl CredentialGenerator for MockGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedCredential, StrongboxError> {
        self.requests.lock().await.push(request.clone());

        if self.failures.lock().await.contains(&request.name) {
            return Err(RegenerationError::GeneratorFailure {
                name: request.name.to_string(),
                reason: "scripted failure".to_string(),
            }
            .into());
        }

        if let Some((name, token)) = self.cancel_after.lock().await.as_ref() {
            if *name == request.name {
                token.cancel();
            }
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        match &request.parameters {
            GenerationParameters::Password(_) => Ok(GeneratedCredential {
                value: CredentialValue::Password(format!("password-{n}")),
                certificate: None,
            }),
            GenerationParameters::User(params) => Ok(GeneratedCredential {
                value: CredentialValue::User {
                    username: params
                        .username
                        .clone()
                        .unwrap_or_else(|| format!("user{n}")),
                    password: format!("password-{n}"),
                },
                certificate: None,
            }),
            GenerationParameters::Certificate(params) => {
                let subject = subject_for(&params.common_name, params.organization.as_deref());
                let (issuer, signer_name, signer_version_id, ca) = match &request.signer {
                    Some(signer) => (
                        signer.subject.clone(),
                        Some(signer.name.clone()),
                        Some(signer.version_id),
                        Some(signer.certificate_pem.clone()),
                    ),
                    None => (subject.clone(), None, None, None),
                };
                let self_signed = request.signer.is_none();
                Ok(GeneratedCredential {
                    value: CredentialValue::Certificate {
                        ca,
                        certificate: format!("certificate-{}-{n}", params.common_name),
                        private_key: format!("private-key-{n}"),
                    },
                    certificate: Some(CertificateMetadata {
                        subject,
                        issuer,
                        signer_name,
                        signer_version_id,
                        is_ca: params.is_ca,
                        self_signed,
                        expires_at: Utc::now() + Duration::days(i64::from(params.duration_days)),
                    }),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_core::{CertificateParameters, SignerMaterial};
    use uuid::Uuid;

    #[tokio::test]
    async fn signed_certificate_records_signer() {
        let generator = MockGenerator::new();
        let signer_version = Uuid::new_v4();
        let mut params = CertificateParameters::new("leaf");
        params.ca = Some(CredentialName::parse("/ca").unwrap());
        let request = GenerationRequest {
            name: CredentialName::parse("/leaf").unwrap(),
            parameters: GenerationParameters::Certificate(params),
            signer: Some(SignerMaterial {
                name: CredentialName::parse("/ca").unwrap(),
                version_id: signer_version,
                subject: "CN=ca".into(),
                certificate_pem: "ca-pem".into(),
                private_key_pem: "ca-key".into(),
            }),
        };

        let generated = generator.generate(&request).await.unwrap();
        let metadata = generated.certificate.unwrap();
        assert_eq!(metadata.subject, "CN=leaf");
        assert_eq!(metadata.issuer, "CN=ca");
        assert_eq!(metadata.signer_version_id, Some(signer_version));
        assert!(!metadata.self_signed);
    }

    #[tokio::test]
    async fn scripted_failure_is_generator_failure() {
        let generator = MockGenerator::new();
        let name = CredentialName::parse("/pw").unwrap();
        generator.fail_for(&name).await;
        let request = GenerationRequest {
            name,
            parameters: GenerationParameters::Password(Default::default()),
            signer: None,
        };
        let err = generator.generate(&request).await.unwrap_err();
        assert!(matches!(
            err,
            StrongboxError::Regeneration(RegenerationError::GeneratorFailure { .. })
        ));
        assert_eq!(generator.requests().await.len(), 1);
    }
}
