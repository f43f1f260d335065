// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential regeneration for Strongbox.
//!
//! [`CertificateRegenerationEngine`] regenerates single credentials and
//! cascades CA regeneration through the [`SigningGraphIndex`], reporting
//! partial failures through a [`RegenerationJob`].

pub mod engine;
pub mod graph;
pub mod job;

pub use engine::CertificateRegenerationEngine;
pub use graph::SigningGraphIndex;
pub use job::{BulkRegenerateResults, FailedRegeneration, JobStatus, RegenerationJob};
