// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider wrapper that simulates a temporarily unreachable backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use strongbox_core::{EncryptedValue, EncryptionError, EncryptionProvider};

/// Delegates to `inner` after failing the first `failures` calls with
/// `ProviderUnavailable`.
pub struct FlakyProvider {
    inner: Arc<dyn EncryptionProvider>,
    remaining: AtomicU32,
    calls: AtomicU32,
}

impl FlakyProvider {
    pub fn new(inner: Arc<dyn EncryptionProvider>, failures: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }

    /// Total encrypt and decrypt calls, failed ones included.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn trip(&self) -> Result<(), EncryptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tripped = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(EncryptionError::ProviderUnavailable {
                provider: self.inner.name().to_string(),
                reason: "simulated outage".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EncryptionProvider for FlakyProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn encrypt(
        &self,
        key_handle: &str,
        plaintext: &[u8],
    ) -> Result<EncryptedValue, EncryptionError> {
        self.trip()?;
        self.inner.encrypt(key_handle, plaintext).await
    }

    async fn decrypt(
        &self,
        key_handle: &str,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>, EncryptionError> {
        self.trip()?;
        self.inner.decrypt(key_handle, ciphertext, nonce).await
    }
}
