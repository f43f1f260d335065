// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Version counts by encryption key status.

use serde::Serialize;
use tracing::warn;

use strongbox_core::{CredentialVersionStore, StrongboxError};

use crate::registry::EncryptionKeyRegistry;

/// How many stored versions each class of key protects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KeyUsage {
    /// Versions under the active key.
    pub active_key: u64,
    /// Versions under retired keys still present in configuration.
    pub inactive_keys: u64,
    /// Versions under keys the registry does not know. These cannot be read.
    pub unknown_keys: u64,
}

pub async fn key_usage(
    registry: &EncryptionKeyRegistry,
    store: &dyn CredentialVersionStore,
) -> Result<KeyUsage, StrongboxError> {
    let active = registry.active_key().ok().map(|k| k.id);
    let mut usage = KeyUsage::default();

    for (key_id, count) in store.count_by_key().await? {
        if Some(key_id) == active {
            usage.active_key += count;
        } else if registry.contains(key_id) {
            usage.inactive_keys += count;
        } else {
            usage.unknown_keys += count;
        }
    }

    if usage.unknown_keys > 0 {
        warn!(
            versions = usage.unknown_keys,
            "stored versions reference encryption keys missing from configuration"
        );
    }
    Ok(usage)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strongbox_core::{CredentialName, CredentialRepository, CredentialValue, NewCredential};
    use strongbox_test_utils::MemoryStore;

    use super::*;
    use crate::registry::tests::random_registry;
    use crate::repository::EncryptedCredentialRepository;

    #[tokio::test]
    async fn counts_split_by_key_status() {
        let store = MemoryStore::new();
        let registry = Arc::new(random_registry(2));
        let repo = EncryptedCredentialRepository::new(Arc::clone(&registry), Arc::new(store.clone()));
        for i in 0..3 {
            repo.append(NewCredential::new(
                CredentialName::parse(&format!("/a/{i}")).unwrap(),
                CredentialValue::Value("v".into()),
            ))
            .await
            .unwrap();
        }

        let usage = key_usage(&registry, &store).await.unwrap();
        assert_eq!(
            usage,
            KeyUsage {
                active_key: 3,
                inactive_keys: 0,
                unknown_keys: 0
            }
        );

        // A registry that has never heard of those keys.
        let stranger = random_registry(1);
        let usage = key_usage(&stranger, &store).await.unwrap();
        assert_eq!(usage.unknown_keys, 3);
        assert_eq!(usage.active_key, 0);
    }

    #[tokio::test]
    async fn empty_store_is_all_zero() {
        let usage = key_usage(&random_registry(1), &MemoryStore::new()).await.unwrap();
        assert_eq!(usage, KeyUsage::default());
    }
}
