// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential model shared by every Strongbox crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::StrongboxError;

/// Hierarchical credential identifier such as `/deploy/prod/db-password`.
///
/// Names are normalised to a single leading `/`, so `foo/bar` and `/foo/bar`
/// refer to the same credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialName(String);

impl CredentialName {
    /// Parse and normalise a raw name.
    pub fn parse(raw: &str) -> Result<Self, StrongboxError> {
        let trimmed = raw.trim();
        let normalised = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };

        if normalised.len() == 1 {
            return Err(StrongboxError::InvalidRequest(
                "credential name must not be empty".to_string(),
            ));
        }
        if normalised.contains("//") || normalised.ends_with('/') {
            return Err(StrongboxError::InvalidRequest(format!(
                "credential name `{raw}` must not contain empty path segments"
            )));
        }
        if let Some(c) = normalised
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '/' | '-' | '_' | '.')))
        {
            return Err(StrongboxError::InvalidRequest(format!(
                "credential name `{raw}` contains invalid character `{c}`"
            )));
        }

        Ok(Self(normalised))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without its leading slash, as used by path-based backends.
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for CredentialName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CredentialName {
    type Err = StrongboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CredentialName {
    type Error = StrongboxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CredentialName> for String {
    fn from(name: CredentialName) -> Self {
        name.0
    }
}

/// The kind of secret a credential holds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CredentialType {
    Value,
    Json,
    Password,
    User,
    Certificate,
    Rsa,
    Ssh,
}

/// Plaintext credential payload.
///
/// This is what gets serialised and encrypted; it never reaches the store in
/// the clear. `Debug` output is redacted.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CredentialValue {
    Value(String),
    Json(serde_json::Value),
    Password(String),
    User {
        username: String,
        password: String,
    },
    Certificate {
        /// PEM of the signing CA, absent for self-signed certificates.
        ca: Option<String>,
        certificate: String,
        private_key: String,
    },
    Rsa {
        public_key: String,
        private_key: String,
    },
    Ssh {
        public_key: String,
        private_key: String,
    },
}

impl CredentialValue {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::Value(_) => CredentialType::Value,
            Self::Json(_) => CredentialType::Json,
            Self::Password(_) => CredentialType::Password,
            Self::User { .. } => CredentialType::User,
            Self::Certificate { .. } => CredentialType::Certificate,
            Self::Rsa { .. } => CredentialType::Rsa,
            Self::Ssh { .. } => CredentialType::Ssh,
        }
    }

    /// Serialise for encryption.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StrongboxError> {
        serde_json::to_vec(self)
            .map_err(|e| StrongboxError::Internal(format!("failed to encode credential value: {e}")))
    }

    /// Inverse of [`CredentialValue::to_bytes`], used after decryption.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StrongboxError> {
        serde_json::from_slice(bytes).map_err(|e| {
            StrongboxError::Internal(format!("decrypted credential value is malformed: {e}"))
        })
    }
}

impl fmt::Debug for CredentialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialValue")
            .field("type", &self.credential_type())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Character-class rules for generated passwords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordParameters {
    #[serde(default = "default_password_length")]
    pub length: usize,
    #[serde(default)]
    pub exclude_upper: bool,
    #[serde(default)]
    pub exclude_lower: bool,
    #[serde(default)]
    pub exclude_number: bool,
    #[serde(default)]
    pub include_special: bool,
}

impl Default for PasswordParameters {
    fn default() -> Self {
        Self {
            length: default_password_length(),
            exclude_upper: false,
            exclude_lower: false,
            exclude_number: false,
            include_special: false,
        }
    }
}

fn default_password_length() -> usize {
    30
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserParameters {
    /// Keep this username across regenerations; random when absent.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: PasswordParameters,
}

/// Key algorithm for generated certificates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum KeyAlgorithm {
    #[default]
    EcdsaP256,
    EcdsaP384,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateParameters {
    pub common_name: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub alternative_names: Vec<String>,
    #[serde(default)]
    pub key_algorithm: KeyAlgorithm,
    #[serde(default = "default_duration_days")]
    pub duration_days: u32,
    #[serde(default)]
    pub is_ca: bool,
    #[serde(default)]
    pub self_sign: bool,
    /// Credential name of the signing CA.
    #[serde(default)]
    pub ca: Option<CredentialName>,
}

impl CertificateParameters {
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            organization: None,
            alternative_names: Vec::new(),
            key_algorithm: KeyAlgorithm::default(),
            duration_days: default_duration_days(),
            is_ca: false,
            self_sign: false,
            ca: None,
        }
    }
}

fn default_duration_days() -> u32 {
    365
}

/// Parameters a credential was generated with, replayed on regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GenerationParameters {
    Password(PasswordParameters),
    User(UserParameters),
    Certificate(CertificateParameters),
}

impl GenerationParameters {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::Password(_) => CredentialType::Password,
            Self::User(_) => CredentialType::User,
            Self::Certificate(_) => CredentialType::Certificate,
        }
    }

    /// The signer named by certificate parameters, if any.
    pub fn signer(&self) -> Option<&CredentialName> {
        match self {
            Self::Certificate(params) if !params.self_sign => params.ca.as_ref(),
            _ => None,
        }
    }
}

/// Plaintext facts about a certificate version, used to derive the signing graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateMetadata {
    /// Distinguished name of this certificate, e.g. `CN=root,O=acme`.
    pub subject: String,
    /// Distinguished name of the signer. Equal to `subject` when self-signed.
    pub issuer: String,
    #[serde(default)]
    pub signer_name: Option<CredentialName>,
    /// The exact signer version this certificate was issued under.
    #[serde(default)]
    pub signer_version_id: Option<Uuid>,
    pub is_ca: bool,
    pub self_signed: bool,
    pub expires_at: DateTime<Utc>,
}

/// Non-secret metadata stored alongside each version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_parameters: Option<GenerationParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateMetadata>,
}

/// An encryption key known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptionKey {
    pub id: Uuid,
    pub provider_name: String,
    /// Provider-specific handle used to address the key material.
    pub key_handle: String,
    pub active: bool,
    /// When this process registered the key. Keys are not persisted, so this
    /// changes on every restart while `id` stays the same.
    pub created_at: DateTime<Utc>,
}

/// An immutable, encrypted credential snapshot as persisted by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialVersion {
    pub id: Uuid,
    pub name: CredentialName,
    pub credential_type: CredentialType,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub encryption_key_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Set when rotation rewrote the ciphertext in place.
    pub rotated_at: Option<DateTime<Utc>>,
    pub metadata: VersionMetadata,
}

/// A decrypted credential version as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialView {
    pub id: Uuid,
    pub name: CredentialName,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    pub value: CredentialValue,
    pub version_created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "is_empty_metadata")]
    pub metadata: VersionMetadata,
}

fn is_empty_metadata(metadata: &VersionMetadata) -> bool {
    metadata == &VersionMetadata::default()
}

/// A write request for a new credential version.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub name: CredentialName,
    pub value: CredentialValue,
    pub metadata: VersionMetadata,
}

impl NewCredential {
    pub fn new(name: CredentialName, value: CredentialValue) -> Self {
        Self {
            name,
            value,
            metadata: VersionMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: VersionMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Latest-version facts about one certificate, enough to build the signing graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateSummary {
    pub name: CredentialName,
    pub version_id: Uuid,
    pub metadata: CertificateMetadata,
}
