// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing generate and set requests.
//!
//! Both arrive as loosely typed JSON. Validation turns them into typed
//! parameters or values and reports problems as
//! [`StrongboxError::InvalidRequest`].

use serde::Deserialize;

use strongbox_core::{
    CredentialName, CredentialType, CredentialValue, GenerationParameters, NewCredential,
    StrongboxError,
};

use crate::validate_parameters;

/// `{"name": ..., "type": ..., "parameters": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub name: String,
    #[serde(rename = "type", default)]
    pub credential_type: Option<String>,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

impl GenerateRequest {
    pub fn new(name: impl Into<String>, credential_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credential_type: Some(credential_type.into()),
            parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Validate into a name and typed generation parameters.
    pub fn validate(&self) -> Result<(CredentialName, GenerationParameters), StrongboxError> {
        let name = CredentialName::parse(&self.name)?;
        let credential_type = parse_type(self.credential_type.as_deref())?;

        match credential_type {
            CredentialType::Password | CredentialType::User | CredentialType::Certificate => {}
            other => {
                return Err(StrongboxError::InvalidRequest(format!(
                    "credentials of type `{other}` cannot be generated"
                )));
            }
        }

        let mut body = match &self.parameters {
            None | Some(serde_json::Value::Null) => serde_json::Map::new(),
            Some(serde_json::Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(StrongboxError::InvalidRequest(
                    "parameters must be a JSON object".to_string(),
                ));
            }
        };
        body.insert(
            "type".to_string(),
            serde_json::Value::String(credential_type.to_string()),
        );

        let parameters: GenerationParameters =
            serde_json::from_value(serde_json::Value::Object(body)).map_err(|e| {
                StrongboxError::InvalidRequest(format!("invalid {credential_type} parameters: {e}"))
            })?;
        validate_parameters(&parameters).map_err(StrongboxError::InvalidRequest)?;

        Ok((name, parameters))
    }
}

/// `{"name": ..., "type": ..., "value": ...}`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub name: String,
    #[serde(rename = "type", default)]
    pub credential_type: Option<String>,
    pub value: serde_json::Value,
}

impl SetRequest {
    pub fn into_new_credential(self) -> Result<NewCredential, StrongboxError> {
        let name = CredentialName::parse(&self.name)?;
        let credential_type = parse_type(self.credential_type.as_deref())?;
        let tagged = serde_json::json!({
            "type": credential_type.to_string(),
            "value": self.value,
        });
        let value: CredentialValue = serde_json::from_value(tagged).map_err(|e| {
            StrongboxError::InvalidRequest(format!("invalid {credential_type} value: {e}"))
        })?;
        Ok(NewCredential::new(name, value))
    }
}

fn parse_type(raw: Option<&str>) -> Result<CredentialType, StrongboxError> {
    let raw = raw.map(str::trim).filter(|t| !t.is_empty()).ok_or_else(|| {
        StrongboxError::InvalidRequest("the request does not include a credential type".to_string())
    })?;
    raw.to_ascii_lowercase()
        .parse()
        .map_err(|_| StrongboxError::InvalidRequest(format!("unknown credential type `{raw}`")))
}
