// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Strongbox credential versions.
//!
//! WAL-mode SQLite with embedded refinery migrations and tokio-rusqlite's
//! single-writer model. Rows hold ciphertext only; plaintext never reaches
//! this crate.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteVersionStore;
pub use database::Database;
