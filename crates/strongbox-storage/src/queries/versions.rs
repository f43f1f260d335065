// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queries over `credential_versions`.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use strongbox_core::{CredentialName, CredentialVersion, StrongboxError};

use crate::database::{Database, map_tr_err};
use crate::models::{VERSION_COLUMNS, VersionRow, into_versions, timestamp};

/// Insert a new version. Fails if the id already exists.
pub async fn insert(db: &Database, version: &CredentialVersion) -> Result<(), StrongboxError> {
    let row = VersionRow::from_version(version)?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO credential_versions
                     (id, name, credential_type, ciphertext, nonce,
                      encryption_key_id, metadata, created_at, rotated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    row.id,
                    row.name,
                    row.credential_type,
                    row.ciphertext,
                    row.nonce,
                    row.encryption_key_id,
                    row.metadata,
                    row.created_at,
                    row.rotated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Newest version of `name`. Ties on `created_at` go to the later insert.
pub async fn latest(
    db: &Database,
    name: &CredentialName,
) -> Result<Option<CredentialVersion>, StrongboxError> {
    let name = name.to_string();
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<VersionRow>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {VERSION_COLUMNS} FROM credential_versions
                     WHERE name = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![name],
                VersionRow::from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    row.map(CredentialVersion::try_from).transpose()
}

pub async fn find_by_id(db: &Database, id: Uuid) -> Result<Option<CredentialVersion>, StrongboxError> {
    let id = id.to_string();
    let row = db
        .connection()
        .call(move |conn| -> Result<Option<VersionRow>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {VERSION_COLUMNS} FROM credential_versions WHERE id = ?1"),
                params![id],
                VersionRow::from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)?;
    row.map(CredentialVersion::try_from).transpose()
}

/// All versions of `name`, newest first.
pub async fn versions(
    db: &Database,
    name: &CredentialName,
) -> Result<Vec<CredentialVersion>, StrongboxError> {
    let name = name.to_string();
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<VersionRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VERSION_COLUMNS} FROM credential_versions
                 WHERE name = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![name], VersionRow::from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    into_versions(rows)
}

/// One keyset page of versions whose key differs from `key_id`, ordered by id.
pub async fn page_not_encrypted_by(
    db: &Database,
    key_id: Uuid,
    after: Option<Uuid>,
    limit: usize,
) -> Result<Vec<CredentialVersion>, StrongboxError> {
    let key_id = key_id.to_string();
    let after = after.map(|id| id.to_string());
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = db
        .connection()
        .call(move |conn| -> Result<Vec<VersionRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VERSION_COLUMNS} FROM credential_versions
                 WHERE encryption_key_id != ?1
                   AND (?2 IS NULL OR id > ?2)
                 ORDER BY id ASC
                 LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![key_id, after, limit], VersionRow::from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    into_versions(rows)
}

/// Rewrite ciphertext only if the row is still under `expected_key_id`.
///
/// Returns false when another writer changed the key first.
pub async fn update_in_place(
    db: &Database,
    version_id: Uuid,
    expected_key_id: Uuid,
    ciphertext: &[u8],
    nonce: &[u8],
    new_key_id: Uuid,
) -> Result<bool, StrongboxError> {
    let version_id = version_id.to_string();
    let expected_key_id = expected_key_id.to_string();
    let new_key_id = new_key_id.to_string();
    let ciphertext = ciphertext.to_vec();
    let nonce = nonce.to_vec();
    let rotated_at = timestamp(Utc::now());
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE credential_versions
                 SET ciphertext = ?1, nonce = ?2, encryption_key_id = ?3, rotated_at = ?4
                 WHERE id = ?5 AND encryption_key_id = ?6",
                params![
                    ciphertext,
                    nonce,
                    new_key_id,
                    rotated_at,
                    version_id,
                    expected_key_id
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_by_key(db: &Database) -> Result<HashMap<Uuid, u64>, StrongboxError> {
    let rows = db
        .connection()
        .call(|conn| -> Result<Vec<(String, i64)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT encryption_key_id, COUNT(*) FROM credential_versions
                 GROUP BY encryption_key_id",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;

    rows.into_iter()
        .map(|(key, count)| {
            let id = Uuid::parse_str(&key).map_err(|e| StrongboxError::Storage {
                source: format!("corrupt encryption_key_id `{key}`: {e}").into(),
            })?;
            Ok((id, u64::try_from(count).unwrap_or(0)))
        })
        .collect()
}

/// Latest version of every credential whose latest version is a certificate.
pub async fn latest_certificates(db: &Database) -> Result<Vec<CredentialVersion>, StrongboxError> {
    let rows = db
        .connection()
        .call(|conn| -> Result<Vec<VersionRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {VERSION_COLUMNS} FROM credential_versions v
                 WHERE v.credential_type = 'certificate'
                   AND v.rowid = (
                       SELECT w.rowid FROM credential_versions w
                       WHERE w.name = v.name
                       ORDER BY w.created_at DESC, w.rowid DESC
                       LIMIT 1)
                 ORDER BY v.name ASC"
            ))?;
            let rows = stmt.query_map([], VersionRow::from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    into_versions(rows)
}
