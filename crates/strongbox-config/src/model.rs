// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Strongbox.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Strongbox configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrongboxConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Credential database location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Encryption keys, in priority order. The first key is active.
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Background re-encryption tuning.
    #[serde(default)]
    pub rotation: RotationConfig,

    /// Which credential backend serves reads and writes.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Connection settings for the external secret vault.
    #[serde(default)]
    pub external: ExternalConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "strongbox".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("strongbox").join("strongbox.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("strongbox.db"))
        .to_string_lossy()
        .into_owned()
}

/// Encryption provider implementations that can back a configured key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// AES-256-GCM with a key derived from a password via Argon2id.
    #[default]
    Internal,
}

/// One configured encryption key.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionKeyConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Password the AES key is derived from.
    pub encryption_password: String,

    /// Hex-encoded 16-byte Argon2id salt.
    pub salt: String,
}

impl std::fmt::Debug for EncryptionKeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeyConfig")
            .field("provider", &self.provider)
            .field("encryption_password", &"[REDACTED]")
            .field("salt", &self.salt)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub keys: Vec<EncryptionKeyConfig>,

    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iteration count (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id parallelism lanes (default: 4).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn default_kdf_memory_cost() -> u32 {
    65536 // 64 MiB per OWASP recommendation
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RotationConfig {
    /// Versions fetched per scan page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Attempts per version before a transient failure is recorded.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each further attempt.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on the retry delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_page_size() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Encrypted versions in the local SQLite store.
    #[default]
    Internal,
    /// A vault-style secret service reached over HTTP.
    External,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalConfig {
    /// Base URL of the vault, e.g. `https://vault.internal:8443`.
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub account: Option<String>,

    /// Host or user identity that authenticates with `api_key`.
    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Policy branch under which variables are declared.
    #[serde(default)]
    pub policy: Option<String>,

    /// How long a fetched access token is reused before re-authenticating.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            account: None,
            user: None,
            api_key: None,
            policy: None,
            token_ttl_secs: default_token_ttl_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ExternalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalConfig")
            .field("base_url", &self.base_url)
            .field("account", &self.account)
            .field("user", &self.user)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("policy", &self.policy)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_token_ttl_secs() -> u64 {
    // Vault tokens live eight minutes; refresh with margin.
    360
}

fn default_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_config_debug_hides_password() {
        let key = EncryptionKeyConfig {
            provider: ProviderKind::Internal,
            encryption_password: "correct horse battery staple".into(),
            salt: "00".repeat(16),
        };
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("horse"));
    }

    #[test]
    fn keys_array_deserializes_in_order() {
        let toml_str = r#"
[[encryption.keys]]
encryption_password = "new-password"
salt = "0102030405060708090a0b0c0d0e0f10"

[[encryption.keys]]
provider = "internal"
encryption_password = "old-password"
salt = "1112131415161718191a1b1c1d1e1f20"
"#;
        let config: StrongboxConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.encryption.keys.len(), 2);
        assert_eq!(config.encryption.keys[0].encryption_password, "new-password");
        assert_eq!(config.encryption.keys[1].provider, ProviderKind::Internal);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let toml_str = r#"
[[encryption.keys]]
provider = "hsm"
encryption_password = "pw"
salt = "0102030405060708090a0b0c0d0e0f10"
"#;
        assert!(toml::from_str::<StrongboxConfig>(toml_str).is_err());
    }

    #[test]
    fn backend_kind_defaults_to_internal() {
        let config = StrongboxConfig::default();
        assert_eq!(config.backend.kind, BackendKind::Internal);
        assert_eq!(config.external.token_ttl_secs, 360);
    }
}
