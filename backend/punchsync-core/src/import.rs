// src/import.rs

use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{info, warn};

use crate::directory::{RecordRef, RemoteDirectory, RemoteError};
use crate::outcome::OutcomeTally;
use crate::sessions::AttendanceSession;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("employee not found in remote directory")]
    EmployeeNotFound,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub session: AttendanceSession,
    pub status: ImportStatus,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportSummary {
    pub tally: OutcomeTally,
    pub outcomes: Vec<ImportOutcome>,
}

impl ImportSummary {
    pub fn successes(&self) -> usize {
        self.tally.successes
    }

    pub fn failures(&self) -> usize {
        self.tally.failures
    }
}

pub struct ImportRunner<'a> {
    directory: &'a dyn RemoteDirectory,
}

impl<'a> ImportRunner<'a> {
    pub fn new(directory: &'a dyn RemoteDirectory) -> Self {
        Self { directory }
    }

    /// Creates one attendance record per session whose identifier is in
    /// `known`. Sessions for other identifiers are skipped and not counted.
    /// Each session is tried exactly once and a failure never stops the loop.
    pub async fn run(
        &self,
        sessions: &[AttendanceSession],
        known: &BTreeSet<String>,
    ) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for session in sessions.iter().filter(|s| known.contains(&s.identifier)) {
            let outcome = match self.import_session(session).await {
                Ok(record) => {
                    summary.tally.record_success();
                    info!(
                        "✓ Created attendance record {} for employee {} on {}",
                        record.0, session.identifier, session.date
                    );
                    ImportOutcome {
                        session: session.clone(),
                        status: ImportStatus::Succeeded,
                        error_message: None,
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(
                        "✗ Error for employee {} on {}: {}",
                        session.identifier, session.date, message
                    );
                    summary.tally.record_failure(&message, &session.identifier);
                    ImportOutcome {
                        session: session.clone(),
                        status: ImportStatus::Failed,
                        error_message: Some(message),
                    }
                }
            };
            summary.outcomes.push(outcome);
        }
        summary
    }

    async fn import_session(&self, session: &AttendanceSession) -> Result<RecordRef, ImportError> {
        // Resolved again rather than reusing classification, the directory
        // may have changed in between.
        let employee = self
            .directory
            .resolve_employee(&session.identifier)
            .await?
            .ok_or(ImportError::EmployeeNotFound)?;
        let record = self
            .directory
            .create_attendance_session(employee, session.check_in, Some(session.check_out))
            .await?;
        Ok(record)
    }
}
