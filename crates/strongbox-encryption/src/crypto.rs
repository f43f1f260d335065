// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Low-level AES-256-GCM seal/open operations.
//!
//! Every call to [`seal`] draws a fresh random 96-bit nonce from the system
//! CSPRNG. Nonce reuse under one key breaks GCM, so nonces are never derived.

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use strongbox_core::{EncryptedValue, EncryptionError};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

fn cipher_failure(reason: &str) -> EncryptionError {
    EncryptionError::CipherFailure {
        reason: reason.to_string(),
    }
}

fn aead_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, EncryptionError> {
    UnboundKey::new(&AES_256_GCM, key)
        .map(LessSafeKey::new)
        .map_err(|_| cipher_failure("failed to create AES-256-GCM key"))
}

/// Encrypt `plaintext` under `key` with a random nonce.
///
/// The returned ciphertext carries the 16-byte authentication tag.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<EncryptedValue, EncryptionError> {
    let sealing_key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| cipher_failure("failed to generate random nonce"))?;

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| cipher_failure("AES-256-GCM encryption failed"))?;

    Ok(EncryptedValue {
        ciphertext: in_out,
        nonce: nonce_bytes.to_vec(),
    })
}

/// Decrypt a value produced by [`seal`].
///
/// Fails with `CipherFailure` on a wrong key, a malformed nonce, or tampered data.
pub fn open(
    key: &[u8; KEY_LEN],
    ciphertext: &[u8],
    nonce: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let nonce: [u8; NONCE_LEN] = nonce.try_into().map_err(|_| EncryptionError::CipherFailure {
        reason: format!("nonce must be {NONCE_LEN} bytes, got {}", nonce.len()),
    })?;
    let opening_key = aead_key(key)?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = opening_key
        .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
        .map_err(|_| cipher_failure("AES-256-GCM decryption failed: wrong key or corrupted data"))?;

    Ok(plaintext.to_vec())
}

/// Generate a random AES-256 key.
pub fn generate_random_key() -> Result<[u8; KEY_LEN], EncryptionError> {
    let mut key = [0u8; KEY_LEN];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| cipher_failure("failed to generate random key"))?;
    Ok(key)
}

/// SHA-256 over the key material. Identifies a key without revealing it.
pub fn fingerprint(key: &[u8; KEY_LEN]) -> [u8; 32] {
    Sha256::digest(key).into()
}
