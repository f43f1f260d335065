// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk regeneration jobs and their results.

use serde::Serialize;
use strum::Display;
use uuid::Uuid;

use strongbox_core::{CredentialName, RegenerationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::CompletedWithErrors | Self::Failed)
    }

    fn can_move_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::CompletedWithErrors)
                | (Self::Running, Self::Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRegeneration {
    pub name: CredentialName,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkRegenerateResults {
    /// Regenerated names in processing order, signer first.
    pub successful: Vec<CredentialName>,
    /// Failures sorted by name.
    pub failed: Vec<FailedRegeneration>,
}

impl BulkRegenerateResults {
    fn record_failure(&mut self, name: CredentialName, reason: String) {
        let at = self.failed.partition_point(|f| f.name < name);
        self.failed.insert(at, FailedRegeneration { name, reason });
    }
}

/// One cascading regeneration rooted at a signer.
#[derive(Debug, Clone, Serialize)]
pub struct RegenerationJob {
    pub id: Uuid,
    pub signer_name: CredentialName,
    /// Transitive dependents known when the job started.
    pub affected_names: Vec<CredentialName>,
    pub status: JobStatus,
    pub results: BulkRegenerateResults,
    pub cancelled: bool,
}

impl RegenerationJob {
    pub fn new(signer_name: CredentialName) -> Self {
        Self {
            id: Uuid::new_v4(),
            signer_name,
            affected_names: Vec::new(),
            status: JobStatus::Pending,
            results: BulkRegenerateResults::default(),
            cancelled: false,
        }
    }

    pub fn transition(&mut self, next: JobStatus) -> Result<(), RegenerationError> {
        if !self.status.can_move_to(next) {
            return Err(RegenerationError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn record_success(&mut self, name: CredentialName) {
        self.results.successful.push(name);
    }

    pub fn record_failure(&mut self, name: CredentialName, reason: impl Into<String>) {
        self.results.record_failure(name, reason.into());
    }

    /// Move a running job to its terminal state based on recorded failures.
    pub fn finish(&mut self) -> Result<(), RegenerationError> {
        let next = if self.results.failed.is_empty() {
            JobStatus::Completed
        } else {
            JobStatus::CompletedWithErrors
        };
        self.transition(next)
    }
}
