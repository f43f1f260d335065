// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations. Each returns the JSON document to print.

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use strongbox_core::{CredentialName, StrongboxError};
use strongbox_encryption::KeyUsage;
use strongbox_generate::{GenerateRequest, SetRequest};

use crate::services::Services;

#[derive(Debug, Serialize)]
struct KeyStatus {
    id: Uuid,
    provider: String,
    active: bool,
    /// No stored version references this key.
    retirable: bool,
}

#[derive(Debug, Serialize)]
struct KeyUsageOutput {
    keys: Vec<KeyStatus>,
    usage: KeyUsage,
}

fn to_json(value: impl Serialize) -> Result<Value, StrongboxError> {
    serde_json::to_value(value)
        .map_err(|e| StrongboxError::Internal(format!("failed to encode output: {e}")))
}

pub async fn rotate(services: &Services, cancel: &CancellationToken) -> Result<Value, StrongboxError> {
    let report = services.rotation()?.rotate_with_cancel(cancel).await?;
    to_json(report)
}

pub async fn key_usage(services: &Services) -> Result<Value, StrongboxError> {
    let rotation = services.rotation()?;
    let mut keys = Vec::new();
    if let Some(registry) = &services.registry {
        for key in registry.all_keys() {
            keys.push(KeyStatus {
                id: key.id,
                provider: key.provider_name.clone(),
                active: key.active,
                retirable: !key.active && rotation.can_retire(key.id).await?,
            });
        }
    }
    let usage = rotation.key_usage().await?;
    to_json(KeyUsageOutput { keys, usage })
}

pub async fn get(
    services: &Services,
    name: &str,
    version: Option<Uuid>,
) -> Result<Value, StrongboxError> {
    let view = match version {
        Some(id) => services.repository.find_by_id(id).await?,
        None => services.repository.latest(&CredentialName::parse(name)?).await?,
    };
    to_json(view)
}

/// `value` and `password` take the argument verbatim; other types take JSON.
fn parse_set_value(credential_type: &str, raw: &str) -> Result<Value, StrongboxError> {
    match credential_type.to_ascii_lowercase().as_str() {
        "value" | "password" => Ok(Value::String(raw.to_string())),
        _ => serde_json::from_str(raw).map_err(|e| {
            StrongboxError::InvalidRequest(format!(
                "value for type `{credential_type}` must be JSON: {e}"
            ))
        }),
    }
}

pub async fn set(
    services: &Services,
    name: &str,
    credential_type: &str,
    raw_value: &str,
) -> Result<Value, StrongboxError> {
    let request = SetRequest {
        name: name.to_string(),
        credential_type: Some(credential_type.to_string()),
        value: parse_set_value(credential_type, raw_value)?,
    };
    to_json(services.engine.set(request).await?)
}

pub async fn generate(
    services: &Services,
    name: &str,
    credential_type: &str,
    parameters: Option<&str>,
) -> Result<Value, StrongboxError> {
    let mut request = GenerateRequest::new(name, credential_type);
    if let Some(raw) = parameters {
        let parameters = serde_json::from_str(raw).map_err(|e| {
            StrongboxError::InvalidRequest(format!("parameters must be JSON: {e}"))
        })?;
        request = request.with_parameters(parameters);
    }
    to_json(services.engine.generate(&request).await?)
}

pub async fn regenerate(services: &Services, name: &str) -> Result<Value, StrongboxError> {
    let name = CredentialName::parse(name)?;
    to_json(services.engine.handle_regenerate(&name).await?)
}

pub async fn bulk_regenerate(
    services: &Services,
    signer: &str,
    cancel: &CancellationToken,
) -> Result<Value, StrongboxError> {
    let signer = CredentialName::parse(signer)?;
    let job = services
        .engine
        .handle_bulk_regenerate_with_cancel(&signer, cancel)
        .await?;
    to_json(job)
}
