// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row representation of `credential_versions` and its conversion to the
//! core model.
//!
//! Rows are read as plain SQLite values inside the connection thread and
//! parsed outside it, so parse failures surface as `StrongboxError` rather
//! than being squeezed into `rusqlite::Error`.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use strongbox_core::{CredentialName, CredentialVersion, StrongboxError, VersionMetadata};

/// Column list shared by every SELECT, in [`VersionRow::from_row`] order.
pub const VERSION_COLUMNS: &str = "id, name, credential_type, ciphertext, nonce, \
     encryption_key_id, metadata, created_at, rotated_at";

#[derive(Debug, Clone)]
pub struct VersionRow {
    pub id: String,
    pub name: String,
    pub credential_type: String,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub encryption_key_id: String,
    pub metadata: String,
    pub created_at: String,
    pub rotated_at: Option<String>,
}

impl VersionRow {
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            credential_type: row.get(2)?,
            ciphertext: row.get(3)?,
            nonce: row.get(4)?,
            encryption_key_id: row.get(5)?,
            metadata: row.get(6)?,
            created_at: row.get(7)?,
            rotated_at: row.get(8)?,
        })
    }

    pub fn from_version(version: &CredentialVersion) -> Result<Self, StrongboxError> {
        Ok(Self {
            id: version.id.to_string(),
            name: version.name.to_string(),
            credential_type: version.credential_type.to_string(),
            ciphertext: version.ciphertext.clone(),
            nonce: version.nonce.clone(),
            encryption_key_id: version.encryption_key_id.to_string(),
            metadata: serde_json::to_string(&version.metadata).map_err(StrongboxError::storage)?,
            created_at: timestamp(version.created_at),
            rotated_at: version.rotated_at.map(timestamp),
        })
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn corrupt(column: &str, id: &str, detail: impl std::fmt::Display) -> StrongboxError {
    StrongboxError::Storage {
        source: format!("corrupt {column} in credential version {id}: {detail}").into(),
    }
}

fn parse_time(column: &str, id: &str, raw: &str) -> Result<DateTime<Utc>, StrongboxError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(column, id, e))
}

impl TryFrom<VersionRow> for CredentialVersion {
    type Error = StrongboxError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&row.id).map_err(|e| corrupt("id", &row.id, e))?;
        let encryption_key_id = Uuid::parse_str(&row.encryption_key_id)
            .map_err(|e| corrupt("encryption_key_id", &row.id, e))?;
        let name = CredentialName::parse(&row.name).map_err(|e| corrupt("name", &row.id, e))?;
        let credential_type = row
            .credential_type
            .parse()
            .map_err(|e| corrupt("credential_type", &row.id, e))?;
        let metadata: VersionMetadata =
            serde_json::from_str(&row.metadata).map_err(|e| corrupt("metadata", &row.id, e))?;
        let created_at = parse_time("created_at", &row.id, &row.created_at)?;
        let rotated_at = row
            .rotated_at
            .as_deref()
            .map(|raw| parse_time("rotated_at", &row.id, raw))
            .transpose()?;

        Ok(CredentialVersion {
            id,
            name,
            credential_type,
            ciphertext: row.ciphertext,
            nonce: row.nonce,
            encryption_key_id,
            created_at,
            rotated_at,
            metadata,
        })
    }
}

/// Convert a batch of rows, failing on the first corrupt one.
pub fn into_versions(rows: Vec<VersionRow>) -> Result<Vec<CredentialVersion>, StrongboxError> {
    rows.into_iter().map(CredentialVersion::try_from).collect()
}
