// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single and cascading credential regeneration.

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use strongbox_core::{
    CredentialGenerator, CredentialName, CredentialRepository, CredentialValue, CredentialView,
    GenerationParameters, GenerationRequest, NewCredential, RegenerationError, SignerMaterial,
    StrongboxError, VersionMetadata,
};
use strongbox_generate::{GenerateRequest, SetRequest};

use crate::graph::SigningGraphIndex;
use crate::job::{JobStatus, RegenerationJob};

pub struct CertificateRegenerationEngine {
    repository: Arc<dyn CredentialRepository>,
    generator: Arc<dyn CredentialGenerator>,
}

impl CertificateRegenerationEngine {
    pub fn new(
        repository: Arc<dyn CredentialRepository>,
        generator: Arc<dyn CredentialGenerator>,
    ) -> Self {
        Self {
            repository,
            generator,
        }
    }

    /// Create a new version from a caller's generate request.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<CredentialView, StrongboxError> {
        let (name, parameters) = request.validate()?;
        let view = self.generate_version(name, parameters).await?;
        info!(name = %view.name, version = %view.id, "credential generated");
        Ok(view)
    }

    /// Store a caller-provided value as a new version.
    pub async fn set(&self, request: SetRequest) -> Result<CredentialView, StrongboxError> {
        let credential = request.into_new_credential()?;
        let view = self.repository.append(credential).await?;
        info!(name = %view.name, version = %view.id, "credential set");
        Ok(view)
    }

    /// Replace `name` with fresh material generated from its stored parameters.
    pub async fn handle_regenerate(
        &self,
        name: &CredentialName,
    ) -> Result<CredentialView, StrongboxError> {
        let latest = self.repository.latest(name).await.map_err(|e| match e {
            StrongboxError::NotFound { .. } => RegenerationError::NotFound {
                name: name.to_string(),
            }
            .into(),
            other => other,
        })?;
        let parameters = latest.metadata.generation_parameters.ok_or_else(|| {
            RegenerationError::NotRegeneratable {
                name: name.to_string(),
            }
        })?;

        let view = self.generate_version(name.clone(), parameters).await?;
        info!(name = %name, previous = %latest.id, version = %view.id, "credential regenerated");
        Ok(view)
    }

    pub async fn handle_bulk_regenerate(
        &self,
        signer_name: &CredentialName,
    ) -> Result<RegenerationJob, StrongboxError> {
        self.handle_bulk_regenerate_with_cancel(signer_name, &CancellationToken::new())
            .await
    }

    /// Regenerate `signer_name` and every certificate it transitively signed.
    ///
    /// Rejections before any write (unknown signer, cycle, a backend without
    /// certificate indexing) are returned as errors. Once writing starts the
    /// outcome is reported through the returned job.
    pub async fn handle_bulk_regenerate_with_cancel(
        &self,
        signer_name: &CredentialName,
        cancel: &CancellationToken,
    ) -> Result<RegenerationJob, StrongboxError> {
        let mut job = RegenerationJob::new(signer_name.clone());
        info!(job = %job.id, signer = %signer_name, "bulk regeneration started");

        let graph = match self.prepare(signer_name).await {
            Ok(graph) => graph,
            Err(e) => {
                job.transition(JobStatus::Failed)?;
                warn!(job = %job.id, signer = %signer_name, error = %e, "bulk regeneration rejected");
                return Err(e);
            }
        };
        if let Some(graph) = &graph {
            job.affected_names = graph.cascade_order(signer_name);
        }

        job.transition(JobStatus::Running)?;
        if let Err(e) = self.handle_regenerate(signer_name).await {
            warn!(job = %job.id, signer = %signer_name, error = %e, "signer regeneration failed");
            job.record_failure(signer_name.clone(), e.to_string());
            job.transition(JobStatus::Failed)?;
            return Ok(job);
        }
        job.record_success(signer_name.clone());

        if let Some(graph) = &graph {
            self.cascade(graph, &mut job, cancel).await;
        }

        job.finish()?;
        info!(
            job = %job.id,
            status = %job.status,
            successful = job.results.successful.len(),
            failed = job.results.failed.len(),
            cancelled = job.cancelled,
            "bulk regeneration finished"
        );
        Ok(job)
    }

    /// Load the signer and, if it is a CA, a cycle-checked signing graph.
    async fn prepare(
        &self,
        signer_name: &CredentialName,
    ) -> Result<Option<SigningGraphIndex>, StrongboxError> {
        let signer = self.repository.latest(signer_name).await.map_err(|e| match e {
            StrongboxError::NotFound { .. } => RegenerationError::NotFound {
                name: signer_name.to_string(),
            }
            .into(),
            other => other,
        })?;
        let is_ca = signer
            .metadata
            .certificate
            .as_ref()
            .is_some_and(|c| c.is_ca);
        if !is_ca {
            return Ok(None);
        }

        let graph = SigningGraphIndex::build(self.repository.latest_certificates().await?);
        graph.check_acyclic(signer_name)?;
        Ok(Some(graph))
    }

    /// Depth-first over dependents. Children of a failed node are skipped.
    async fn cascade(
        &self,
        graph: &SigningGraphIndex,
        job: &mut RegenerationJob,
        cancel: &CancellationToken,
    ) {
        let mut seen = HashSet::from([job.signer_name.clone()]);
        let mut stack: Vec<CredentialName> =
            graph.dependents_of(&job.signer_name).into_iter().rev().collect();

        while let Some(name) = stack.pop() {
            if cancel.is_cancelled() {
                warn!(job = %job.id, remaining = stack.len() + 1, "bulk regeneration cancelled");
                job.cancelled = true;
                break;
            }
            if !seen.insert(name.clone()) {
                continue;
            }

            match self.handle_regenerate(&name).await {
                Ok(_) => {
                    stack.extend(graph.dependents_of(&name).into_iter().rev());
                    job.record_success(name);
                }
                Err(e) => {
                    warn!(job = %job.id, name = %name, error = %e, "dependent regeneration failed");
                    job.record_failure(name, e.to_string());
                }
            }
        }
    }

    async fn generate_version(
        &self,
        name: CredentialName,
        parameters: GenerationParameters,
    ) -> Result<CredentialView, StrongboxError> {
        let signer = match parameters.signer() {
            Some(ca) => Some(self.signer_material(&name, ca).await?),
            None => None,
        };
        let request = GenerationRequest {
            name,
            parameters,
            signer,
        };

        let generated = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| match e {
                StrongboxError::Regeneration(RegenerationError::GeneratorFailure { .. }) => e,
                other => RegenerationError::GeneratorFailure {
                    name: request.name.to_string(),
                    reason: other.to_string(),
                }
                .into(),
            })?;

        let metadata = VersionMetadata {
            generation_parameters: Some(request.parameters),
            certificate: generated.certificate,
        };
        self.repository
            .append(NewCredential::new(request.name, generated.value).with_metadata(metadata))
            .await
    }

    /// The latest version of `ca`, which must be a certificate with a key.
    async fn signer_material(
        &self,
        name: &CredentialName,
        ca: &CredentialName,
    ) -> Result<SignerMaterial, StrongboxError> {
        let failure = |reason: String| -> StrongboxError {
            RegenerationError::GeneratorFailure {
                name: name.to_string(),
                reason,
            }
            .into()
        };

        let view = match self.repository.latest(ca).await {
            Ok(view) => view,
            Err(StrongboxError::NotFound { .. }) => {
                return Err(failure(format!("signing CA `{ca}` not found")));
            }
            Err(e) => return Err(e),
        };
        let (CredentialValue::Certificate {
            certificate,
            private_key,
            ..
        }, Some(metadata)) = (view.value, view.metadata.certificate)
        else {
            return Err(failure(format!("signing CA `{ca}` is not a certificate")));
        };
        if !metadata.is_ca {
            return Err(failure(format!("`{ca}` is not a certificate authority")));
        }

        Ok(SignerMaterial {
            name: view.name,
            version_id: view.id,
            subject: metadata.subject,
            certificate_pem: certificate,
            private_key_pem: private_key,
        })
    }
}
