// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encryption provider trait.

use async_trait::async_trait;

use crate::error::EncryptionError;

/// Ciphertext plus the nonce needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
}

/// Encrypts and decrypts bytes under a named key handle.
///
/// A provider may hold several keys; the handle selects which one. Calls may
/// block on I/O for remote providers, so both operations are async.
#[async_trait]
pub trait EncryptionProvider: Send + Sync + 'static {
    /// Human-readable provider name, recorded on every [`crate::EncryptionKey`].
    fn name(&self) -> &str;

    async fn encrypt(
        &self,
        key_handle: &str,
        plaintext: &[u8],
    ) -> Result<EncryptedValue, EncryptionError>;

    async fn decrypt(
        &self,
        key_handle: &str,
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> Result<Vec<u8>, EncryptionError>;
}
