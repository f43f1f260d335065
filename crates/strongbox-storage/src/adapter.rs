// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of `CredentialVersionStore`.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use strongbox_config::model::StorageConfig;
use strongbox_core::{CredentialName, CredentialVersion, CredentialVersionStore, StrongboxError};

use crate::database::Database;
use crate::queries::versions;

/// Delegates every store operation to the typed queries in [`versions`].
pub struct SqliteVersionStore {
    db: Database,
}

impl SqliteVersionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the database named in `[storage]`.
    pub async fn open(config: &StorageConfig) -> Result<Self, StrongboxError> {
        Ok(Self::new(Database::open(&config.database_path).await?))
    }

    /// Flush the WAL and close the connection.
    pub async fn close(self) -> Result<(), StrongboxError> {
        self.db.close().await
    }
}

#[async_trait]
impl CredentialVersionStore for SqliteVersionStore {
    async fn insert(&self, version: &CredentialVersion) -> Result<(), StrongboxError> {
        versions::insert(&self.db, version).await
    }

    async fn latest(
        &self,
        name: &CredentialName,
    ) -> Result<Option<CredentialVersion>, StrongboxError> {
        versions::latest(&self.db, name).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialVersion>, StrongboxError> {
        versions::find_by_id(&self.db, id).await
    }

    async fn versions(&self, name: &CredentialName) -> Result<Vec<CredentialVersion>, StrongboxError> {
        versions::versions(&self.db, name).await
    }

    async fn page_not_encrypted_by(
        &self,
        key_id: Uuid,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<CredentialVersion>, StrongboxError> {
        versions::page_not_encrypted_by(&self.db, key_id, after, limit).await
    }

    async fn update_in_place(
        &self,
        version_id: Uuid,
        expected_key_id: Uuid,
        ciphertext: &[u8],
        nonce: &[u8],
        new_key_id: Uuid,
    ) -> Result<bool, StrongboxError> {
        versions::update_in_place(
            &self.db,
            version_id,
            expected_key_id,
            ciphertext,
            nonce,
            new_key_id,
        )
        .await
    }

    async fn count_by_key(&self) -> Result<HashMap<Uuid, u64>, StrongboxError> {
        versions::count_by_key(&self.db).await
    }

    async fn latest_certificates(&self) -> Result<Vec<CredentialVersion>, StrongboxError> {
        versions::latest_certificates(&self.db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use strongbox_core::{CredentialType, VersionMetadata};

    #[tokio::test]
    async fn store_trait_round_trips_through_sqlite() {
        let store: Box<dyn CredentialVersionStore> =
            Box::new(SqliteVersionStore::new(Database::open_in_memory().await.unwrap()));
        let version = CredentialVersion {
            id: Uuid::new_v4(),
            name: CredentialName::parse("svc/key").unwrap(),
            credential_type: CredentialType::Password,
            ciphertext: vec![4, 5, 6],
            nonce: vec![7; 12],
            encryption_key_id: Uuid::new_v4(),
            created_at: Utc::now(),
            rotated_at: None,
            metadata: VersionMetadata::default(),
        };
        store.insert(&version).await.unwrap();

        let latest = store.latest(&version.name).await.unwrap().unwrap();
        assert_eq!(latest.id, version.id);
        assert_eq!(latest.credential_type, CredentialType::Password);
        assert_eq!(store.versions(&version.name).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn open_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("s.db").to_string_lossy().into_owned(),
        };
        let store = SqliteVersionStore::open(&config).await.unwrap();
        assert!(store.count_by_key().await.unwrap().is_empty());
        store.close().await.unwrap();
    }
}
