// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Strongbox configuration system.

use strongbox_config::diagnostic::ConfigError;
use strongbox_config::model::{BackendKind, StrongboxConfig};
use strongbox_config::{load_and_validate_str, load_config_from_str};

#[test]
fn full_config_deserializes() {
    let toml = r#"
[service]
name = "strongbox-test"
log_level = "debug"

[storage]
database_path = "/tmp/strongbox.db"

[encryption]
kdf_memory_cost = 32768
kdf_iterations = 2

[[encryption.keys]]
encryption_password = "active-password"
salt = "000102030405060708090a0b0c0d0e0f"

[[encryption.keys]]
encryption_password = "retired-password"
salt = "f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff"

[rotation]
page_size = 50
max_attempts = 5

[backend]
kind = "external"

[external]
base_url = "https://vault.example.com"
account = "acme"
user = "host/strongbox"
api_key = "api-key"
policy = "root"
token_ttl_secs = 120
"#;

    let config = load_and_validate_str(toml).expect("config should validate");
    assert_eq!(config.service.name, "strongbox-test");
    assert_eq!(config.storage.database_path, "/tmp/strongbox.db");
    assert_eq!(config.encryption.keys.len(), 2);
    assert_eq!(config.encryption.kdf_memory_cost, 32768);
    assert_eq!(config.rotation.page_size, 50);
    assert_eq!(config.rotation.max_attempts, 5);
    assert_eq!(config.rotation.initial_backoff_ms, 100);
    assert_eq!(config.backend.kind, BackendKind::External);
    assert_eq!(config.external.policy.as_deref(), Some("root"));
    assert_eq!(config.external.token_ttl_secs, 120);
}

#[test]
fn empty_config_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.service.name, "strongbox");
    assert_eq!(config.service.log_level, "info");
    assert!(config.encryption.keys.is_empty());
    assert_eq!(config.encryption.kdf_memory_cost, 65536);
    assert_eq!(config.rotation.page_size, 100);
    assert_eq!(config.rotation.max_attempts, 3);
    assert_eq!(config.rotation.max_backoff_ms, 2000);
    assert_eq!(config.backend.kind, BackendKind::Internal);
    assert!(config.external.base_url.is_none());
}

#[test]
fn typo_in_rotation_gets_suggestion() {
    let toml = r#"
[rotation]
page_sise = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "page_sise");
            assert_eq!(suggestion.as_deref(), Some("page_size"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn unknown_backend_kind_reports_choices() {
    let toml = r#"
[backend]
kind = "hsm"
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown variant");
    let rendered = errors[0].to_string();
    assert!(rendered.contains("hsm"), "got: {rendered}");
}

#[test]
fn missing_salt_reports_missing_key() {
    let toml = r#"
[[encryption.keys]]
encryption_password = "pw"
"#;

    let errors = load_and_validate_str(toml).expect_err("salt is required");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::MissingKey { key } if key.ends_with("salt"))),
        "got: {errors:?}"
    );
}

#[test]
fn validation_errors_are_collected() {
    let toml = r#"
[encryption]
kdf_iterations = 1

[[encryption.keys]]
encryption_password = "pw"
salt = "000102030405060708090a0b0c0d0e0f"

[rotation]
max_attempts = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("two failures");
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| matches!(e, ConfigError::Validation { .. })));
}

#[test]
fn dotted_override_reaches_nested_field() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: StrongboxConfig = Figment::new()
        .merge(Serialized::defaults(StrongboxConfig::default()))
        .merge(Toml::string("[external]\ntoken_ttl_secs = 60\n"))
        .merge(("external.token_ttl_secs", 30))
        .extract()
        .expect("override should merge");
    assert_eq!(config.external.token_ttl_secs, 30);
}
