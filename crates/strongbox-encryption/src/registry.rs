// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The encryption key registry.
//!
//! Built once at startup from the ordered key configuration and shared by
//! `Arc`. The first key is active: every new write is encrypted with it.
//! The remaining keys are retired and only ever used to decrypt versions
//! that still reference them.

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use strongbox_config::model::{EncryptionConfig, ProviderKind};
use strongbox_core::{
    EncryptedValue, EncryptionError, EncryptionKey, EncryptionProvider, StrongboxError,
};

use crate::internal::InternalProvider;
use crate::kdf::{self, KdfParams};

/// Key material a provider has been given, before the registry assigns it an id.
pub struct KeySource {
    pub provider: Arc<dyn EncryptionProvider>,
    pub key_handle: String,
    /// SHA-256 of the key material.
    pub fingerprint: [u8; 32],
}

struct RegisteredKey {
    key: EncryptionKey,
    provider: Arc<dyn EncryptionProvider>,
}

/// Immutable lookup table from key id to key metadata and provider.
pub struct EncryptionKeyRegistry {
    keys: Vec<RegisteredKey>,
}

impl std::fmt::Debug for EncryptionKeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKeyRegistry")
            .field(
                "keys",
                &self.keys.iter().map(|k| &k.key).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Stable key id: the first 16 bytes of SHA-256(provider name, 0x00, fingerprint).
pub fn derive_key_id(provider_name: &str, fingerprint: &[u8; 32]) -> Uuid {
    let digest = Sha256::new()
        .chain_update(provider_name.as_bytes())
        .chain_update([0u8])
        .chain_update(fingerprint)
        .finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    uuid::Builder::from_custom_bytes(bytes).into_uuid()
}

impl EncryptionKeyRegistry {
    /// Build a registry from sources in priority order; the first is active.
    ///
    /// Two sources that resolve to the same key id are rejected.
    pub fn new(sources: Vec<KeySource>) -> Result<Self, StrongboxError> {
        let created_at = Utc::now();
        let mut keys: Vec<RegisteredKey> = Vec::with_capacity(sources.len());

        for (index, source) in sources.into_iter().enumerate() {
            let id = derive_key_id(source.provider.name(), &source.fingerprint);
            if let Some(position) = keys.iter().position(|k| k.key.id == id) {
                return Err(StrongboxError::Config(format!(
                    "encryption.keys[{index}] duplicates encryption.keys[{position}] (key {id})"
                )));
            }
            debug!(key_id = %id, provider = source.provider.name(), active = index == 0, "registered encryption key");
            keys.push(RegisteredKey {
                key: EncryptionKey {
                    id,
                    provider_name: source.provider.name().to_string(),
                    key_handle: source.key_handle,
                    active: index == 0,
                    created_at,
                },
                provider: source.provider,
            });
        }

        Ok(Self { keys })
    }

    /// Derive every configured key and build the registry.
    ///
    /// Argon2id runs once per configured key and is CPU bound.
    pub fn from_config(config: &EncryptionConfig) -> Result<Self, StrongboxError> {
        let params = KdfParams::from(config);
        let mut internal = InternalProvider::new();
        let mut handles = Vec::with_capacity(config.keys.len());

        for (index, key_config) in config.keys.iter().enumerate() {
            match key_config.provider {
                ProviderKind::Internal => {
                    let salt = kdf::parse_salt(&key_config.salt).map_err(|e| {
                        StrongboxError::Config(format!("encryption.keys[{index}]: {e}"))
                    })?;
                    let key =
                        kdf::derive_key(key_config.encryption_password.as_bytes(), &salt, params)?;
                    handles.push(internal.add_key(key));
                }
            }
        }

        let provider: Arc<dyn EncryptionProvider> = Arc::new(internal);
        let registry = Self::new(
            handles
                .into_iter()
                .map(|(key_handle, fingerprint)| KeySource {
                    provider: Arc::clone(&provider),
                    key_handle,
                    fingerprint,
                })
                .collect(),
        )?;

        info!(keys = registry.keys.len(), "encryption key registry loaded");
        Ok(registry)
    }

    /// The key used for all new writes.
    pub fn active_key(&self) -> Result<&EncryptionKey, EncryptionError> {
        self.keys
            .first()
            .map(|k| &k.key)
            .ok_or(EncryptionError::NoActiveKey)
    }

    pub fn key_by_id(&self, id: Uuid) -> Result<&EncryptionKey, EncryptionError> {
        self.entry(id).map(|k| &k.key)
    }

    /// All keys in configuration order, active first.
    pub fn all_keys(&self) -> impl Iterator<Item = &EncryptionKey> {
        self.keys.iter().map(|k| &k.key)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.keys.iter().any(|k| k.key.id == id)
    }

    pub fn provider_for(&self, id: Uuid) -> Result<Arc<dyn EncryptionProvider>, EncryptionError> {
        self.entry(id).map(|k| Arc::clone(&k.provider))
    }

    /// Encrypt with the active key, returning the key id to record.
    pub async fn encrypt_active(
        &self,
        plaintext: &[u8],
    ) -> Result<(Uuid, EncryptedValue), EncryptionError> {
        let active = self.keys.first().ok_or(EncryptionError::NoActiveKey)?;
        let sealed = active
            .provider
            .encrypt(&active.key.key_handle, plaintext)
            .await?;
        Ok((active.key.id, sealed))
    }

    /// Decrypt with the key a version was written under.
    pub async fn decrypt(
        &self,
        key_id: Uuid,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>, EncryptionError> {
        let entry = self.entry(key_id)?;
        entry
            .provider
            .decrypt(&entry.key.key_handle, ciphertext, nonce)
            .await
    }

    fn entry(&self, id: Uuid) -> Result<&RegisteredKey, EncryptionError> {
        self.keys
            .iter()
            .find(|k| k.key.id == id)
            .ok_or_else(|| EncryptionError::KeyNotFound { key: id.to_string() })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use strongbox_config::model::EncryptionKeyConfig;
    use zeroize::Zeroizing;

    use crate::crypto::{KEY_LEN, generate_random_key};

    /// Registry over `n` random internal keys plus the shared provider.
    pub(crate) fn random_registry(n: usize) -> EncryptionKeyRegistry {
        let mut provider = InternalProvider::new();
        let handles: Vec<_> = (0..n)
            .map(|_| provider.add_key(Zeroizing::new(generate_random_key().unwrap())))
            .collect();
        let provider: Arc<dyn EncryptionProvider> = Arc::new(provider);
        EncryptionKeyRegistry::new(
            handles
                .into_iter()
                .map(|(key_handle, fingerprint)| KeySource {
                    provider: Arc::clone(&provider),
                    key_handle,
                    fingerprint,
                })
                .collect(),
        )
        .unwrap()
    }

    fn fast_config(passwords: &[&str]) -> EncryptionConfig {
        EncryptionConfig {
            keys: passwords
                .iter()
                .map(|p| EncryptionKeyConfig {
                    provider: ProviderKind::Internal,
                    encryption_password: p.to_string(),
                    salt: "000102030405060708090a0b0c0d0e0f".into(),
                })
                .collect(),
            kdf_memory_cost: 8192,
            kdf_iterations: 1,
            kdf_parallelism: 1,
        }
    }

    #[test]
    fn first_key_is_active() {
        let registry = random_registry(3);
        let keys: Vec<_> = registry.all_keys().collect();
        assert_eq!(keys.len(), 3);
        assert!(keys[0].active);
        assert!(!keys[1].active && !keys[2].active);
        assert_eq!(registry.active_key().unwrap().id, keys[0].id);
    }

    #[test]
    fn empty_registry_has_no_active_key() {
        let registry = EncryptionKeyRegistry::new(Vec::new()).unwrap();
        assert_eq!(registry.active_key().unwrap_err(), EncryptionError::NoActiveKey);
    }

    #[test]
    fn unknown_id_is_key_not_found() {
        let registry = random_registry(1);
        assert!(matches!(
            registry.key_by_id(Uuid::new_v4()),
            Err(EncryptionError::KeyNotFound { .. })
        ));
        assert!(registry.provider_for(Uuid::new_v4()).is_err());
    }

    #[test]
    fn key_ids_are_stable_across_restarts() {
        let a = EncryptionKeyRegistry::from_config(&fast_config(&["one", "two"])).unwrap();
        let b = EncryptionKeyRegistry::from_config(&fast_config(&["one", "two"])).unwrap();
        let ids_a: Vec<Uuid> = a.all_keys().map(|k| k.id).collect();
        let ids_b: Vec<Uuid> = b.all_keys().map(|k| k.id).collect();
        assert_eq!(ids_a, ids_b);
        assert_ne!(ids_a[0], ids_a[1]);
    }

    #[test]
    fn created_at_is_registration_time() {
        let before = Utc::now();
        let registry = random_registry(2);
        let after = Utc::now();
        let stamps: Vec<_> = registry.all_keys().map(|k| k.created_at).collect();
        assert_eq!(stamps[0], stamps[1]);
        assert!(before <= stamps[0] && stamps[0] <= after);
    }

    #[test]
    fn duplicate_key_material_rejected() {
        let err = EncryptionKeyRegistry::from_config(&fast_config(&["same", "same"])).unwrap_err();
        assert!(err.to_string().contains("duplicates encryption.keys[0]"));
    }

    #[test]
    fn provider_name_feeds_key_id() {
        let fingerprint = crate::crypto::fingerprint(&[3u8; KEY_LEN]);
        assert_ne!(
            derive_key_id("internal", &fingerprint),
            derive_key_id("hsm", &fingerprint)
        );
    }

    #[tokio::test]
    async fn retired_key_still_decrypts() {
        let old = EncryptionKeyRegistry::from_config(&fast_config(&["old"])).unwrap();
        let (old_id, sealed) = old.encrypt_active(b"legacy").await.unwrap();

        let rotated = EncryptionKeyRegistry::from_config(&fast_config(&["new", "old"])).unwrap();
        assert_ne!(rotated.active_key().unwrap().id, old_id);
        assert!(!rotated.key_by_id(old_id).unwrap().active);
        let plaintext = rotated
            .decrypt(old_id, &sealed.ciphertext, &sealed.nonce)
            .await
            .unwrap();
        assert_eq!(plaintext, b"legacy");
    }
}
