// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background re-encryption of stored versions under the active key.
//!
//! The coordinator walks the store in keyset-paginated pages of versions not
//! yet encrypted by the active key. Each version is decrypted with the key it
//! records, re-encrypted with the active key, and written back with a
//! conditional update keyed on the key id read at scan time. A concurrent
//! writer that got there first makes the update a no-op, counted as a
//! conflict.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use strongbox_config::model::RotationConfig;
use strongbox_core::{CredentialVersion, CredentialVersionStore, StrongboxError};

use crate::registry::EncryptionKeyRegistry;
use crate::usage::{self, KeyUsage};

/// Paging and retry knobs for a rotation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationSettings {
    pub page_size: usize,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RotationSettings {
    fn default() -> Self {
        Self::from(&RotationConfig::default())
    }
}

impl From<&RotationConfig> for RotationSettings {
    fn from(config: &RotationConfig) -> Self {
        Self {
            page_size: config.page_size.max(1),
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RotationSettings {
    /// Delay before retry number `retry` (1-based): doubles each time, capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// One version rotation gave up on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationFailure {
    pub version_id: Uuid,
    /// The key the version was (and still is) encrypted under.
    pub key_id: Uuid,
    pub reason: String,
}

/// A page read that failed after every retry; the scan stopped there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    /// Cursor the failed read started after. `None` is the first page.
    pub after: Option<Uuid>,
    pub reason: String,
}

/// Outcome of a rotation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    /// Versions examined.
    pub scanned: u64,
    /// Versions rewritten under the active key.
    pub rotated: u64,
    /// Versions someone else updated between scan and write.
    pub conflicts: u64,
    pub failures: Vec<RotationFailure>,
    /// Set when the scan stopped because a page could not be read.
    pub page_failure: Option<PageFailure>,
    /// The run stopped early on cancellation.
    pub cancelled: bool,
}

enum Outcome {
    Rotated,
    Conflict,
}

pub struct KeyRotationCoordinator {
    registry: Arc<EncryptionKeyRegistry>,
    store: Arc<dyn CredentialVersionStore>,
    settings: RotationSettings,
}

impl KeyRotationCoordinator {
    pub fn new(
        registry: Arc<EncryptionKeyRegistry>,
        store: Arc<dyn CredentialVersionStore>,
        settings: RotationSettings,
    ) -> Self {
        Self {
            registry,
            store,
            settings,
        }
    }

    /// Re-encrypt every version not yet under the active key.
    pub async fn rotate(&self) -> Result<RotationReport, StrongboxError> {
        self.rotate_with_cancel(&CancellationToken::new()).await
    }

    /// Like [`rotate`](Self::rotate), checking `cancel` between pages.
    ///
    /// Versions rewritten before cancellation keep their new ciphertext.
    pub async fn rotate_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RotationReport, StrongboxError> {
        let active_id = self.registry.active_key()?.id;
        let mut report = RotationReport::default();
        let mut after: Option<Uuid> = None;

        info!(active_key = %active_id, page_size = self.settings.page_size, "key rotation started");

        loop {
            if cancel.is_cancelled() {
                warn!(scanned = report.scanned, "key rotation cancelled");
                report.cancelled = true;
                break;
            }

            let page = match self.fetch_page(active_id, after).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(after = ?after, scanned = report.scanned, error = %e, "failed to read rotation page, scan stopped");
                    report.page_failure = Some(PageFailure {
                        after,
                        reason: e.to_string(),
                    });
                    break;
                }
            };
            let Some(last) = page.last() else {
                break;
            };
            after = Some(last.id);
            let full_page = page.len() >= self.settings.page_size;

            for version in &page {
                report.scanned += 1;
                match self.rotate_version(version, active_id).await {
                    Ok(Outcome::Rotated) => report.rotated += 1,
                    Ok(Outcome::Conflict) => {
                        debug!(version_id = %version.id, "version changed during rotation, skipped");
                        report.conflicts += 1;
                    }
                    Err(e) => {
                        warn!(version_id = %version.id, key_id = %version.encryption_key_id, error = %e, "failed to rotate version");
                        report.failures.push(RotationFailure {
                            version_id: version.id,
                            key_id: version.encryption_key_id,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            if !full_page {
                break;
            }
        }

        info!(
            scanned = report.scanned,
            rotated = report.rotated,
            conflicts = report.conflicts,
            failures = report.failures.len(),
            incomplete = report.page_failure.is_some(),
            "key rotation finished"
        );
        Ok(report)
    }

    /// Counts of versions by key status.
    pub async fn key_usage(&self) -> Result<KeyUsage, StrongboxError> {
        usage::key_usage(&self.registry, self.store.as_ref()).await
    }

    /// True when no stored version references `key_id`.
    ///
    /// Run after a rotation completes; only then can the key be removed from
    /// configuration.
    pub async fn can_retire(&self, key_id: Uuid) -> Result<bool, StrongboxError> {
        let counts = self.store.count_by_key().await?;
        let remaining = counts.get(&key_id).copied().unwrap_or(0);
        if remaining > 0 {
            debug!(key_id = %key_id, remaining, "key still referenced");
        }
        Ok(remaining == 0)
    }

    async fn fetch_page(
        &self,
        active_id: Uuid,
        after: Option<Uuid>,
    ) -> Result<Vec<CredentialVersion>, StrongboxError> {
        let mut attempt = 1;
        loop {
            match self
                .store
                .page_not_encrypted_by(active_id, after, self.settings.page_size)
                .await
            {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.settings.max_attempts => {
                    self.pause(attempt, &e).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn rotate_version(
        &self,
        version: &CredentialVersion,
        active_id: Uuid,
    ) -> Result<Outcome, StrongboxError> {
        let mut attempt = 1;
        loop {
            match self.try_rotate(version, active_id).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_transient() && attempt < self.settings.max_attempts => {
                    self.pause(attempt, &e).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_rotate(
        &self,
        version: &CredentialVersion,
        active_id: Uuid,
    ) -> Result<Outcome, StrongboxError> {
        let plaintext = self
            .registry
            .decrypt(version.encryption_key_id, &version.ciphertext, &version.nonce)
            .await?;
        let (key_id, sealed) = self.registry.encrypt_active(&plaintext).await?;
        if key_id != active_id {
            return Err(StrongboxError::Internal(
                "active key changed during rotation".to_string(),
            ));
        }

        let updated = self
            .store
            .update_in_place(
                version.id,
                version.encryption_key_id,
                &sealed.ciphertext,
                &sealed.nonce,
                active_id,
            )
            .await?;

        Ok(if updated {
            Outcome::Rotated
        } else {
            Outcome::Conflict
        })
    }

    async fn pause(&self, attempt: u32, error: &StrongboxError) {
        let delay = self.settings.backoff(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, error = %error, "transient failure, retrying");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;
    use zeroize::Zeroizing;

    use strongbox_core::{
        CredentialName, CredentialRepository, CredentialType, CredentialValue, EncryptionProvider,
        NewCredential, VersionMetadata,
    };
    use strongbox_test_utils::{FlakyProvider, MemoryStore};

    use super::*;
    use crate::crypto::generate_random_key;
    use crate::internal::InternalProvider;
    use crate::registry::KeySource;
    use crate::repository::EncryptedCredentialRepository;

    /// One key held by its own provider, so tests can swap the provider.
    #[derive(Clone)]
    struct TestKey {
        provider: Arc<dyn EncryptionProvider>,
        handle: String,
        fingerprint: [u8; 32],
    }

    impl TestKey {
        fn random() -> Self {
            let mut provider = InternalProvider::new();
            let (handle, fingerprint) =
                provider.add_key(Zeroizing::new(generate_random_key().unwrap()));
            Self {
                provider: Arc::new(provider),
                handle,
                fingerprint,
            }
        }

        fn behind(&self, provider: Arc<dyn EncryptionProvider>) -> Self {
            Self {
                provider,
                ..self.clone()
            }
        }

        fn source(&self) -> KeySource {
            KeySource {
                provider: Arc::clone(&self.provider),
                key_handle: self.handle.clone(),
                fingerprint: self.fingerprint,
            }
        }
    }

    fn registry(keys: &[&TestKey]) -> Arc<EncryptionKeyRegistry> {
        Arc::new(EncryptionKeyRegistry::new(keys.iter().map(|k| k.source()).collect()).unwrap())
    }

    fn fast_settings() -> RotationSettings {
        RotationSettings {
            page_size: 2,
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    fn name(raw: &str) -> CredentialName {
        CredentialName::parse(raw).unwrap()
    }

    async fn seed(
        registry: &Arc<EncryptionKeyRegistry>,
        store: &MemoryStore,
        count: usize,
    ) -> Vec<Uuid> {
        let repo =
            EncryptedCredentialRepository::new(Arc::clone(registry), Arc::new(store.clone()));
        let mut ids = Vec::new();
        for i in 0..count {
            let view = repo
                .append(NewCredential::new(
                    name(&format!("/svc/{i}")),
                    CredentialValue::Value(format!("secret-{i}")),
                ))
                .await
                .unwrap();
            ids.push(view.id);
        }
        ids
    }

    #[tokio::test]
    async fn rotates_everything_then_is_idempotent() {
        let (old_key, new_key) = (TestKey::random(), TestKey::random());
        let old = registry(&[&old_key]);
        let new = registry(&[&new_key, &old_key]);
        let store = MemoryStore::new();
        let ids = seed(&old, &store, 5).await;

        let coordinator =
            KeyRotationCoordinator::new(Arc::clone(&new), Arc::new(store.clone()), fast_settings());
        let report = coordinator.rotate().await.unwrap();
        assert_eq!(report.scanned, 5);
        assert_eq!(report.rotated, 5);
        assert_eq!(report.conflicts, 0);
        assert!(report.failures.is_empty());

        let active = new.active_key().unwrap().id;
        for version in store.all().await {
            assert_eq!(version.encryption_key_id, active);
            assert!(version.rotated_at.is_some());
        }
        assert!(coordinator.can_retire(old.active_key().unwrap().id).await.unwrap());
        assert!(!coordinator.can_retire(active).await.unwrap());

        // Same ids, same plaintext.
        let repo = EncryptedCredentialRepository::new(Arc::clone(&new), Arc::new(store.clone()));
        for (i, id) in ids.iter().enumerate() {
            let view = repo.find_by_id(*id).await.unwrap();
            assert_eq!(view.value, CredentialValue::Value(format!("secret-{i}")));
        }

        let writes_before = store.update_count().await;
        let second = coordinator.rotate().await.unwrap();
        assert_eq!(second.scanned, 0);
        assert_eq!(store.update_count().await, writes_before);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (old_key, new_key) = (TestKey::random(), TestKey::random());
        let store = MemoryStore::new();
        seed(&registry(&[&old_key]), &store, 1).await;

        let flaky = Arc::new(FlakyProvider::new(Arc::clone(&old_key.provider), 2));
        let coordinator = KeyRotationCoordinator::new(
            registry(&[&new_key, &old_key.behind(flaky.clone())]),
            Arc::new(store.clone()),
            fast_settings(),
        );
        let report = coordinator.rotate().await.unwrap();
        assert_eq!(report.rotated, 1);
        assert!(report.failures.is_empty());
        assert!(report.page_failure.is_none());
        assert_eq!(flaky.calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_are_reported_and_run_continues() {
        let (old_key, new_key) = (TestKey::random(), TestKey::random());
        let old = registry(&[&old_key]);
        let store = MemoryStore::new();
        seed(&old, &store, 3).await;
        let old_id = old.active_key().unwrap().id;

        // Three straight failures exhaust the first version's attempts only.
        let flaky = Arc::new(FlakyProvider::new(Arc::clone(&old_key.provider), 3));
        let coordinator = KeyRotationCoordinator::new(
            registry(&[&new_key, &old_key.behind(flaky)]),
            Arc::new(store.clone()),
            fast_settings(),
        );
        let report = coordinator.rotate().await.unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.rotated, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key_id, old_id);
        assert!(report.failures[0].reason.contains("simulated outage"));
        assert!(!coordinator.can_retire(old_id).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_key_is_permanent_failure() {
        let store = MemoryStore::new();
        store
            .insert(&CredentialVersion {
                id: Uuid::new_v4(),
                name: name("/orphan"),
                credential_type: CredentialType::Value,
                ciphertext: vec![1, 2, 3],
                nonce: vec![0; 12],
                encryption_key_id: Uuid::new_v4(),
                created_at: Utc::now(),
                rotated_at: None,
                metadata: VersionMetadata::default(),
            })
            .await
            .unwrap();

        let coordinator = KeyRotationCoordinator::new(
            registry(&[&TestKey::random()]),
            Arc::new(store.clone()),
            fast_settings(),
        );
        let report = coordinator.rotate().await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.contains("encryption key not found"));

        let usage = coordinator.key_usage().await.unwrap();
        assert_eq!(usage.unknown_keys, 1);
        assert_eq!(usage.active_key, 0);
    }

    /// Store that lets a competing writer act just before our first conditional
    /// update, and slips a fresh write in after the first page is read.
    struct RacingStore {
        inner: MemoryStore,
        competitor_key: Uuid,
        raced: Mutex<bool>,
        fresh_write: Mutex<Option<NewCredential>>,
        registry: Arc<EncryptionKeyRegistry>,
    }

    #[async_trait]
    impl CredentialVersionStore for RacingStore {
        async fn insert(&self, version: &CredentialVersion) -> Result<(), StrongboxError> {
            self.inner.insert(version).await
        }

        async fn latest(
            &self,
            name: &CredentialName,
        ) -> Result<Option<CredentialVersion>, StrongboxError> {
            self.inner.latest(name).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialVersion>, StrongboxError> {
            self.inner.find_by_id(id).await
        }

        async fn versions(
            &self,
            name: &CredentialName,
        ) -> Result<Vec<CredentialVersion>, StrongboxError> {
            self.inner.versions(name).await
        }

        async fn page_not_encrypted_by(
            &self,
            key_id: Uuid,
            after: Option<Uuid>,
            limit: usize,
        ) -> Result<Vec<CredentialVersion>, StrongboxError> {
            let page = self.inner.page_not_encrypted_by(key_id, after, limit).await?;
            if let Some(fresh) = self.fresh_write.lock().await.take() {
                let repo = EncryptedCredentialRepository::new(
                    Arc::clone(&self.registry),
                    Arc::new(self.inner.clone()),
                );
                repo.append(fresh).await?;
            }
            Ok(page)
        }

        async fn update_in_place(
            &self,
            version_id: Uuid,
            expected_key_id: Uuid,
            ciphertext: &[u8],
            nonce: &[u8],
            new_key_id: Uuid,
        ) -> Result<bool, StrongboxError> {
            let mut raced = self.raced.lock().await;
            if !*raced {
                *raced = true;
                if let Some(current) = self.inner.find_by_id(version_id).await? {
                    self.inner
                        .update_in_place(
                            version_id,
                            current.encryption_key_id,
                            &current.ciphertext,
                            &current.nonce,
                            self.competitor_key,
                        )
                        .await?;
                }
            }
            self.inner
                .update_in_place(version_id, expected_key_id, ciphertext, nonce, new_key_id)
                .await
        }

        async fn count_by_key(&self) -> Result<HashMap<Uuid, u64>, StrongboxError> {
            self.inner.count_by_key().await
        }

        async fn latest_certificates(&self) -> Result<Vec<CredentialVersion>, StrongboxError> {
            self.inner.latest_certificates().await
        }
    }

    #[tokio::test]
    async fn concurrent_writer_wins_and_fresh_write_is_untouched() {
        let (old_key, new_key) = (TestKey::random(), TestKey::random());
        let new = registry(&[&new_key, &old_key]);
        let store = MemoryStore::new();
        seed(&registry(&[&old_key]), &store, 2).await;

        let competitor = Uuid::new_v4();
        let racing = Arc::new(RacingStore {
            inner: store.clone(),
            competitor_key: competitor,
            raced: Mutex::new(false),
            fresh_write: Mutex::new(Some(NewCredential::new(
                name("/fresh"),
                CredentialValue::Value("fresh".into()),
            ))),
            registry: Arc::clone(&new),
        });

        let coordinator = KeyRotationCoordinator::new(Arc::clone(&new), racing, fast_settings());
        let report = coordinator.rotate().await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.conflicts, 1);
        assert_eq!(report.rotated, 1);

        let all = store.all().await;
        assert_eq!(
            all.iter().filter(|v| v.encryption_key_id == competitor).count(),
            1
        );

        let fresh = store.latest(&name("/fresh")).await.unwrap().unwrap();
        assert_eq!(fresh.encryption_key_id, new.active_key().unwrap().id);
        assert!(fresh.rotated_at.is_none());
    }

    /// Store whose page reads fail after the first one.
    struct FailingPages {
        inner: MemoryStore,
        reads: Mutex<u32>,
    }

    #[async_trait]
    impl CredentialVersionStore for FailingPages {
        async fn insert(&self, version: &CredentialVersion) -> Result<(), StrongboxError> {
            self.inner.insert(version).await
        }

        async fn latest(
            &self,
            name: &CredentialName,
        ) -> Result<Option<CredentialVersion>, StrongboxError> {
            self.inner.latest(name).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialVersion>, StrongboxError> {
            self.inner.find_by_id(id).await
        }

        async fn versions(
            &self,
            name: &CredentialName,
        ) -> Result<Vec<CredentialVersion>, StrongboxError> {
            self.inner.versions(name).await
        }

        async fn page_not_encrypted_by(
            &self,
            key_id: Uuid,
            after: Option<Uuid>,
            limit: usize,
        ) -> Result<Vec<CredentialVersion>, StrongboxError> {
            let mut reads = self.reads.lock().await;
            *reads += 1;
            if *reads > 1 {
                return Err(StrongboxError::storage(std::io::Error::other("disk busy")));
            }
            self.inner.page_not_encrypted_by(key_id, after, limit).await
        }

        async fn update_in_place(
            &self,
            version_id: Uuid,
            expected_key_id: Uuid,
            ciphertext: &[u8],
            nonce: &[u8],
            new_key_id: Uuid,
        ) -> Result<bool, StrongboxError> {
            self.inner
                .update_in_place(version_id, expected_key_id, ciphertext, nonce, new_key_id)
                .await
        }

        async fn count_by_key(&self) -> Result<HashMap<Uuid, u64>, StrongboxError> {
            self.inner.count_by_key().await
        }

        async fn latest_certificates(&self) -> Result<Vec<CredentialVersion>, StrongboxError> {
            self.inner.latest_certificates().await
        }
    }

    #[tokio::test]
    async fn unreadable_page_stops_scan_but_keeps_report() {
        let (old_key, new_key) = (TestKey::random(), TestKey::random());
        let store = MemoryStore::new();
        seed(&registry(&[&old_key]), &store, 4).await;

        let pages = Arc::new(FailingPages {
            inner: store.clone(),
            reads: Mutex::new(0),
        });
        let coordinator = KeyRotationCoordinator::new(
            registry(&[&new_key, &old_key]),
            pages.clone(),
            fast_settings(),
        );
        let report = coordinator.rotate().await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.rotated, 2);
        assert!(report.failures.is_empty());
        assert!(!report.cancelled);
        let failure = report.page_failure.expect("scan should record the failed page");
        assert!(failure.after.is_some());
        assert!(failure.reason.contains("disk busy"), "{}", failure.reason);
        // First read plus every attempt at the second page.
        assert_eq!(*pages.reads.lock().await, 1 + fast_settings().max_attempts);
        assert_eq!(store.update_count().await, 2);
    }

    #[tokio::test]
    async fn cancelled_before_start_writes_nothing() {
        let (old_key, new_key) = (TestKey::random(), TestKey::random());
        let store = MemoryStore::new();
        seed(&registry(&[&old_key]), &store, 3).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let coordinator = KeyRotationCoordinator::new(
            registry(&[&new_key, &old_key]),
            Arc::new(store.clone()),
            fast_settings(),
        );
        let report = coordinator.rotate_with_cancel(&cancel).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.scanned, 0);
        assert_eq!(store.update_count().await, 0);
    }

    #[tokio::test]
    async fn empty_registry_cannot_rotate() {
        let coordinator = KeyRotationCoordinator::new(
            Arc::new(EncryptionKeyRegistry::new(Vec::new()).unwrap()),
            Arc::new(MemoryStore::new()),
            fast_settings(),
        );
        let err = coordinator.rotate().await.unwrap_err();
        assert_eq!(err.to_string(), "no active encryption key is configured");
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let settings = RotationSettings {
            page_size: 10,
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(settings.backoff(1), Duration::from_millis(100));
        assert_eq!(settings.backoff(2), Duration::from_millis(200));
        assert_eq!(settings.backoff(3), Duration::from_millis(350));
        assert_eq!(settings.backoff(30), Duration::from_millis(350));
    }

    #[test]
    fn settings_follow_config() {
        let settings = RotationSettings::default();
        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.initial_backoff, Duration::from_millis(100));
        assert_eq!(settings.max_backoff, Duration::from_millis(2000));
    }
}
