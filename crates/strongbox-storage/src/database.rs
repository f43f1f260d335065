// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection management: PRAGMA setup, WAL mode, migrations, and shutdown.
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! serialises writes. Do not open a second connection for writes.

use std::path::Path;

use tracing::{debug, info};

use strongbox_core::StrongboxError;

use crate::migrations;

const PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
";

/// Convert a tokio-rusqlite failure into a storage error.
pub fn map_tr_err<E>(e: tokio_rusqlite::Error<E>) -> StrongboxError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StrongboxError::storage(e)
}

/// Handle to the credential database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and migrate it.
    pub async fn open(path: &str) -> Result<Self, StrongboxError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StrongboxError::storage)?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(StrongboxError::storage)?;
        let db = Self::prepare(conn).await?;
        info!(path, "credential database opened");
        Ok(db)
    }

    /// A migrated in-memory database.
    pub async fn open_in_memory() -> Result<Self, StrongboxError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(StrongboxError::storage)?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: tokio_rusqlite::Connection) -> Result<Self, StrongboxError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> { conn.execute_batch(PRAGMAS) })
            .await
            .map_err(map_tr_err)?;

        let applied = conn
            .call(migrations::run_migrations)
            .await
            .map_err(map_tr_err)?;
        if applied > 0 {
            debug!(applied, "database migrations applied");
        }

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), StrongboxError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(map_tr_err)?;
        debug!("credential database closed");
        Ok(())
    }
}
