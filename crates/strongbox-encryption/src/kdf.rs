// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id derivation of AES keys from configured passwords.

use zeroize::Zeroizing;

use strongbox_config::model::EncryptionConfig;
use strongbox_core::StrongboxError;

use crate::crypto::KEY_LEN;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<&EncryptionConfig> for KdfParams {
    fn from(config: &EncryptionConfig) -> Self {
        Self {
            memory_cost: config.kdf_memory_cost,
            iterations: config.kdf_iterations,
            parallelism: config.kdf_parallelism,
        }
    }
}

/// Derive a 32-byte key from `password` and a 16-byte `salt`.
///
/// The key is zeroed on drop.
pub fn derive_key(
    password: &[u8],
    salt: &[u8; 16],
    params: KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>, StrongboxError> {
    let argon_params = argon2::Params::new(
        params.memory_cost,
        params.iterations,
        params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| StrongboxError::Config(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let mut output = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, output.as_mut())
        .map_err(|e| StrongboxError::Config(format!("Argon2id key derivation failed: {e}")))?;

    Ok(output)
}

/// Decode a hex salt from configuration.
pub fn parse_salt(hex_salt: &str) -> Result<[u8; 16], StrongboxError> {
    let bytes = hex::decode(hex_salt.trim())
        .map_err(|e| StrongboxError::Config(format!("salt is not valid hex: {e}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        StrongboxError::Config(format!("salt must be 16 bytes, got {}", bytes.len()))
    })
}
