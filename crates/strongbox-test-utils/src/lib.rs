// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for Strongbox.
//!
//! Everything here is in-memory and deterministic so engine, rotation, and
//! CLI tests run without SQLite, real key material, or a vault.
//!
//! # Components
//!
//! - [`MemoryStore`] - encrypted version store backed by a `Vec`
//! - [`MemoryRepository`] - plaintext repository for engine tests
//! - [`MockGenerator`] - scriptable generator with per-name failures
//! - [`FlakyProvider`] - provider wrapper that fails transiently N times

pub mod flaky_provider;
pub mod memory_repository;
pub mod memory_store;
pub mod mock_generator;

pub use flaky_provider::FlakyProvider;
pub use memory_repository::MemoryRepository;
pub use memory_store::MemoryStore;
pub use mock_generator::MockGenerator;
