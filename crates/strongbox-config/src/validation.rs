// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde attributes cannot express: salts that
//! decode to 16 bytes, KDF cost floors, retry bounds, and the fields the
//! external backend needs when it is selected.

use crate::diagnostic::ConfigError;
use crate::model::{BackendKind, StrongboxConfig};

/// Salt length in bytes expected by the Argon2id key derivation.
pub const SALT_LEN: usize = 16;

/// Largest accepted `rotation.page_size`.
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Validate a deserialized configuration.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &StrongboxConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ConfigError::validation("service.name must not be empty"));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    validate_encryption(config, &mut errors);
    validate_rotation(config, &mut errors);

    if config.backend.kind == BackendKind::External {
        validate_external(config, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_encryption(config: &StrongboxConfig, errors: &mut Vec<ConfigError>) {
    let enc = &config.encryption;

    if enc.keys.is_empty() && config.backend.kind == BackendKind::Internal {
        errors.push(ConfigError::validation(
            "encryption.keys must contain at least one key for the internal backend",
        ));
    }

    for (i, key) in enc.keys.iter().enumerate() {
        if key.encryption_password.is_empty() {
            errors.push(ConfigError::validation(format!(
                "encryption.keys[{i}].encryption_password must not be empty"
            )));
        }
        match hex::decode(key.salt.trim()) {
            Ok(bytes) if bytes.len() == SALT_LEN => {}
            Ok(bytes) => errors.push(ConfigError::validation(format!(
                "encryption.keys[{i}].salt must decode to {SALT_LEN} bytes, got {}",
                bytes.len()
            ))),
            Err(e) => errors.push(ConfigError::validation(format!(
                "encryption.keys[{i}].salt is not valid hex: {e}"
            ))),
        }
    }

    if enc.kdf_memory_cost < 32768 {
        errors.push(ConfigError::validation(format!(
            "encryption.kdf_memory_cost must be at least 32768 (32 MiB), got {}",
            enc.kdf_memory_cost
        )));
    }
    if enc.kdf_iterations < 2 {
        errors.push(ConfigError::validation(format!(
            "encryption.kdf_iterations must be at least 2, got {}",
            enc.kdf_iterations
        )));
    }
    if enc.kdf_parallelism < 1 {
        errors.push(ConfigError::validation(
            "encryption.kdf_parallelism must be at least 1",
        ));
    }
}

fn validate_rotation(config: &StrongboxConfig, errors: &mut Vec<ConfigError>) {
    let rot = &config.rotation;

    if rot.page_size == 0 || rot.page_size > MAX_PAGE_SIZE {
        errors.push(ConfigError::validation(format!(
            "rotation.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
            rot.page_size
        )));
    }
    if rot.max_attempts == 0 {
        errors.push(ConfigError::validation(
            "rotation.max_attempts must be at least 1",
        ));
    }
    if rot.initial_backoff_ms > rot.max_backoff_ms {
        errors.push(ConfigError::validation(format!(
            "rotation.initial_backoff_ms ({}) must not exceed rotation.max_backoff_ms ({})",
            rot.initial_backoff_ms, rot.max_backoff_ms
        )));
    }
}

fn validate_external(config: &StrongboxConfig, errors: &mut Vec<ConfigError>) {
    let ext = &config.external;
    let required = [
        ("base_url", &ext.base_url),
        ("account", &ext.account),
        ("user", &ext.user),
        ("api_key", &ext.api_key),
    ];
    for (field, value) in required {
        if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
            errors.push(ConfigError::validation(format!(
                "external.{field} is required when backend.kind = \"external\""
            )));
        }
    }

    if let Some(url) = ext.base_url.as_deref() {
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::validation(format!(
                "external.base_url `{url}` must start with http:// or https://"
            )));
        }
    }

    if ext.token_ttl_secs == 0 {
        errors.push(ConfigError::validation(
            "external.token_ttl_secs must be at least 1",
        ));
    }
    if ext.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "external.timeout_secs must be at least 1",
        ));
    }
}
