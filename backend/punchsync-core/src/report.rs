// src/report.rs

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::outcome::OutcomeTally;
use crate::sessions::AttendanceSession;

pub const SUMMARY_FILE_NAME: &str = "attendance_summary.csv";
pub const DEFAULT_REPORT_DIR: &str = "attendance_analysis";
const SAMPLE_ROWS: usize = 5;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("File I/O error: {context}")]
    Io {
        #[source]
        source: io::Error,
        context: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn io_context<S: Into<String>>(source: io::Error, context: S) -> ReportError {
    ReportError::Io {
        source,
        context: context.into(),
    }
}

/// One row of the per-employee summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeStats {
    pub employee_id: String,
    pub mean_hours: Decimal,
    pub min_hours: Decimal,
    pub max_hours: Decimal,
    pub count: usize,
    pub usual_check_in: String,
    pub usual_check_out: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceReport {
    pub employees: Vec<EmployeeStats>,
    pub total_records: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

fn hours(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(2)
}

/// Most frequent value; ties go to the smallest.
fn most_common<I: Iterator<Item = String>>(values: I) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_default() += 1;
    }
    let mut best: Option<(String, usize)> = None;
    for (value, count) in counts {
        if best.as_ref().map_or(true, |(_, best_count)| count > *best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value).unwrap_or_default()
}

/// Per-employee statistics. `None` when there are no sessions.
pub fn build_report(sessions: &[AttendanceSession]) -> Option<AttendanceReport> {
    let first_date = sessions.iter().map(|s| s.date).min()?;
    let last_date = sessions.iter().map(|s| s.date).max()?;

    let mut by_employee: BTreeMap<&str, Vec<&AttendanceSession>> = BTreeMap::new();
    for session in sessions {
        by_employee
            .entry(session.identifier.as_str())
            .or_default()
            .push(session);
    }

    let employees = by_employee
        .into_iter()
        .map(|(employee_id, rows)| {
            let durations: Vec<f64> = rows.iter().map(|s| s.duration_hours).collect();
            let total: f64 = durations.iter().sum();
            let min = durations.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = durations.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            EmployeeStats {
                employee_id: employee_id.to_string(),
                mean_hours: hours(total / durations.len() as f64),
                min_hours: hours(min),
                max_hours: hours(max),
                count: rows.len(),
                usual_check_in: most_common(
                    rows.iter().map(|s| s.check_in.format("%H:%M:%S").to_string()),
                ),
                usual_check_out: most_common(
                    rows.iter().map(|s| s.check_out.format("%H:%M:%S").to_string()),
                ),
            }
        })
        .collect();

    Some(AttendanceReport {
        employees,
        total_records: sessions.len(),
        first_date,
        last_date,
    })
}

/// Writes the summary table to `{dir}/attendance_summary.csv`, creating
/// `dir` if needed.
pub fn write_summary_csv(report: &AttendanceReport, dir: &Path) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(dir)
        .map_err(|e| io_context(e, format!("Failed to create report directory: {:?}", dir)))?;
    let path = dir.join(SUMMARY_FILE_NAME);

    let mut writer = csv::Writer::from_path(&path)?;
    for row in &report.employees {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .map_err(|e| io_context(e, format!("Failed to write summary file: {:?}", path)))?;

    info!("Summary statistics written to {}", path.display());
    Ok(path)
}

pub fn print_report<W: Write>(
    out: &mut W,
    report: &AttendanceReport,
    sessions: &[AttendanceSession],
    summary_path: Option<&Path>,
) -> io::Result<()> {
    writeln!(out, "\nAttendance Analysis:")?;
    writeln!(out, "Total number of records: {}", report.total_records)?;
    writeln!(out, "Date range: {} to {}", report.first_date, report.last_date)?;
    if let Some(path) = summary_path {
        writeln!(out, "\nSummary statistics saved to '{}'", path.display())?;
    }

    writeln!(
        out,
        "\n{:<12} {:>6} {:>6} {:>6} {:>5}  {:<8}  {:<8}",
        "employee", "mean", "min", "max", "days", "in", "out"
    )?;
    for row in &report.employees {
        writeln!(
            out,
            "{:<12} {:>6} {:>6} {:>6} {:>5}  {:<8}  {:<8}",
            row.employee_id,
            row.mean_hours,
            row.min_hours,
            row.max_hours,
            row.count,
            row.usual_check_in,
            row.usual_check_out
        )?;
    }

    writeln!(out, "\nSample of processed records:")?;
    for s in sessions.iter().take(SAMPLE_ROWS) {
        writeln!(
            out,
            "{:<12} {}  {}  {}  {:.2}h",
            s.identifier, s.date, s.check_in, s.check_out, s.duration_hours
        )?;
    }
    Ok(())
}

/// Wording for one kind of batch summary.
pub struct TallyLabels {
    pub title: &'static str,
    pub succeeded: &'static str,
    pub failed: &'static str,
    pub unit: &'static str,
    pub affected: &'static str,
}

pub const CREATION_LABELS: TallyLabels = TallyLabels {
    title: "Employee Creation Summary:",
    succeeded: "Successfully created",
    failed: "Failed to create",
    unit: "employees",
    affected: "Affected Badge IDs",
};

pub const IMPORT_LABELS: TallyLabels = TallyLabels {
    title: "Import Summary:",
    succeeded: "Successfully imported",
    failed: "Failed to import",
    unit: "records",
    affected: "Affected employees",
};

pub fn print_tally<W: Write>(out: &mut W, labels: &TallyLabels, tally: &OutcomeTally) -> io::Result<()> {
    writeln!(out, "\n{}", labels.title)?;
    writeln!(out, "{}: {} {}", labels.succeeded, tally.successes, labels.unit)?;
    writeln!(out, "{}: {} {}", labels.failed, tally.failures, labels.unit)?;

    if !tally.errors.is_empty() {
        writeln!(out, "\nError Details:")?;
        for group in &tally.errors {
            writeln!(out, "\nError: {}", group.message)?;
            writeln!(out, "{}: {}", labels.affected, group.identifiers.join(", "))?;
        }
    }
    Ok(())
}
