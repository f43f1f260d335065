// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The built-in AES-256-GCM encryption provider.

use std::collections::HashMap;

use async_trait::async_trait;
use zeroize::Zeroizing;

use strongbox_core::{EncryptedValue, EncryptionError, EncryptionProvider};

use crate::crypto::{self, KEY_LEN};

/// Provider name recorded on keys served by [`InternalProvider`].
pub const INTERNAL_PROVIDER: &str = "internal";

/// Holds derived AES keys in memory, addressed by handle.
///
/// Handles are the first 8 bytes of the key fingerprint, hex encoded, so a
/// handle never reveals key material.
#[derive(Default)]
pub struct InternalProvider {
    keys: HashMap<String, Zeroizing<[u8; KEY_LEN]>>,
}

impl InternalProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register key material; returns its handle and full fingerprint.
    ///
    /// Adding the same material twice yields the same handle.
    pub fn add_key(&mut self, key: Zeroizing<[u8; KEY_LEN]>) -> (String, [u8; 32]) {
        let fingerprint = crypto::fingerprint(&key);
        let handle = hex::encode(&fingerprint[..8]);
        self.keys.insert(handle.clone(), key);
        (handle, fingerprint)
    }

    fn key(&self, handle: &str) -> Result<&[u8; KEY_LEN], EncryptionError> {
        self.keys
            .get(handle)
            .map(|k| &**k)
            .ok_or_else(|| EncryptionError::KeyNotFound {
                key: handle.to_string(),
            })
    }
}

impl std::fmt::Debug for InternalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalProvider")
            .field("handles", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl EncryptionProvider for InternalProvider {
    fn name(&self) -> &str {
        INTERNAL_PROVIDER
    }

    async fn encrypt(
        &self,
        key_handle: &str,
        plaintext: &[u8],
    ) -> Result<EncryptedValue, EncryptionError> {
        crypto::seal(self.key(key_handle)?, plaintext)
    }

    async fn decrypt(
        &self,
        key_handle: &str,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>, EncryptionError> {
        crypto::open(self.key(key_handle)?, ciphertext, nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encrypts_under_each_handle_independently() {
        let mut provider = InternalProvider::new();
        let (a, _) = provider.add_key(Zeroizing::new([1u8; KEY_LEN]));
        let (b, _) = provider.add_key(Zeroizing::new([2u8; KEY_LEN]));
        assert_ne!(a, b);

        let sealed = provider.encrypt(&a, b"value").await.unwrap();
        assert_eq!(
            provider.decrypt(&a, &sealed.ciphertext, &sealed.nonce).await.unwrap(),
            b"value"
        );
        assert!(provider.decrypt(&b, &sealed.ciphertext, &sealed.nonce).await.is_err());
    }

    #[tokio::test]
    async fn unknown_handle_is_key_not_found() {
        let provider = InternalProvider::new();
        let err = provider.encrypt("deadbeef", b"x").await.unwrap_err();
        assert_eq!(
            err,
            EncryptionError::KeyNotFound {
                key: "deadbeef".into()
            }
        );
    }

    #[test]
    fn debug_lists_handles_only() {
        let mut provider = InternalProvider::new();
        provider.add_key(Zeroizing::new([9u8; KEY_LEN]));
        let rendered = format!("{provider:?}");
        assert!(rendered.contains("handles"));
        assert!(!rendered.contains("[9, 9"));
    }
}
