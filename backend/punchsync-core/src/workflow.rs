// src/workflow.rs

use std::collections::BTreeSet;
use std::io::{self, Write};
use thiserror::Error;
use tracing::info;

use crate::directory::RemoteDirectory;
use crate::import::{ImportRunner, ImportSummary};
use crate::reconcile::{IncompleteReason, ReconcileError, Reconciler, Reconciliation, ResolutionPrompt};
use crate::report::{print_tally, CREATION_LABELS, IMPORT_LABELS};
use crate::sessions::AttendanceSession;

const MANUAL_CREATION_GUIDE: &str = "\
Please create the employees manually in Odoo:
1. Go to Employees > Employees
2. Click 'Create'
3. Fill in the employee details
4. Set the 'Badge ID' field to match the AC-No. from your punch log

After creating the employees, run this import again.";

const CREATION_GAPS_GUIDE: &str =
    "Some employees could not be created. Please create them manually in Odoo.";

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Failed to write report: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    NothingToImport,
    /// Stopped before importing because some badge ids are still unknown.
    Halted {
        unknown: BTreeSet<String>,
        reason: IncompleteReason,
    },
    Imported(ImportSummary),
}

/// Gates on every badge id resolving, then imports all sessions.
///
/// Nothing is imported unless the whole employee set resolves. Once past that
/// gate, individual session failures are tallied and the pass always runs to
/// the end.
///
/// An empty `sessions` slice returns `NothingToImport` without any remote
/// call. The binary stops before connecting in that case, so this only guards
/// library callers.
pub async fn run_import<W: Write>(
    directory: &dyn RemoteDirectory,
    prompt: &mut dyn ResolutionPrompt,
    sessions: &[AttendanceSession],
    out: &mut W,
) -> Result<WorkflowOutcome, WorkflowError> {
    if sessions.is_empty() {
        writeln!(out, "\nNo attendance sessions to import.")?;
        return Ok(WorkflowOutcome::NothingToImport);
    }

    let identifiers: BTreeSet<String> = sessions.iter().map(|s| s.identifier.clone()).collect();
    writeln!(out, "\nChecking employee records in Odoo...")?;

    let reconciler = Reconciler::new(directory);
    let known = match reconciler.reconcile(&identifiers, prompt).await? {
        Reconciliation::Complete { known, creation } => {
            if let Some(tally) = creation {
                print_tally(out, &CREATION_LABELS, &tally)?;
            }
            known
        }
        Reconciliation::Incomplete {
            unknown,
            reason,
            creation,
        } => {
            if let Some(tally) = creation {
                print_tally(out, &CREATION_LABELS, &tally)?;
            }
            let guide = match reason {
                IncompleteReason::Declined => MANUAL_CREATION_GUIDE,
                IncompleteReason::CreationLeftGaps => CREATION_GAPS_GUIDE,
            };
            writeln!(out, "\n{}", guide)?;
            info!(
                "Import halted: {} badge ids unresolved ({:?})",
                unknown.len(),
                reason
            );
            return Ok(WorkflowOutcome::Halted { unknown, reason });
        }
    };

    writeln!(out, "\nStarting import for existing employees...")?;
    let summary = ImportRunner::new(directory).run(sessions, &known).await;
    print_tally(out, &IMPORT_LABELS, &summary.tally)?;
    info!(
        "Import finished: {} succeeded, {} failed",
        summary.successes(),
        summary.failures()
    );
    Ok(WorkflowOutcome::Imported(summary))
}
