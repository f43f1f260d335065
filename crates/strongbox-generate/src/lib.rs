// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential generation for Strongbox.
//!
//! [`DefaultCredentialGenerator`] produces passwords, users, and ECDSA
//! certificates from [`GenerationParameters`]. Request parsing for the
//! generate and set operations lives in [`request`].

pub mod certificate;
pub mod password;
pub mod request;
pub mod serial;
pub mod user;

use async_trait::async_trait;
use tracing::debug;

use strongbox_core::{
    CredentialGenerator, CredentialValue, GeneratedCredential, GenerationParameters,
    GenerationRequest, RegenerationError, StrongboxError,
};

pub use certificate::subject_for;
pub use request::{GenerateRequest, SetRequest};

/// Check parameters without generating anything.
pub fn validate_parameters(parameters: &GenerationParameters) -> Result<(), String> {
    match parameters {
        GenerationParameters::Password(p) => password::validate(p),
        GenerationParameters::User(u) => password::validate(&u.password),
        GenerationParameters::Certificate(c) => certificate::validate(c),
    }
}

/// Generator backed by the operating system RNG and rcgen.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCredentialGenerator;

impl DefaultCredentialGenerator {
    pub fn new() -> Self {
        Self
    }

    fn generate_sync(request: &GenerationRequest) -> Result<GeneratedCredential, String> {
        match &request.parameters {
            GenerationParameters::Password(params) => Ok(GeneratedCredential {
                value: CredentialValue::Password(password::generate_password(params)?),
                certificate: None,
            }),
            GenerationParameters::User(params) => Ok(GeneratedCredential {
                value: user::generate_user(params)?,
                certificate: None,
            }),
            GenerationParameters::Certificate(params) => {
                certificate::generate_certificate(params, request.signer.as_ref())
            }
        }
    }
}

#[async_trait]
impl CredentialGenerator for DefaultCredentialGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedCredential, StrongboxError> {
        debug!(
            name = %request.name,
            credential_type = %request.parameters.credential_type(),
            "generating credential"
        );
        Self::generate_sync(request).map_err(|reason| {
            RegenerationError::GeneratorFailure {
                name: request.name.to_string(),
                reason,
            }
            .into()
        })
    }
}
