// src/punches.rs

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Timestamp layouts seen in clock exports, tried in order.
const TIMESTAMP_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Maps the clock's `State` column. Anything other than check-in or
    /// check-out (break, overtime markers) has no direction.
    pub fn from_state(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "c/in" | "in" => Some(Direction::In),
            "c/out" | "out" => Some(Direction::Out),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunchEvent {
    pub identifier: String,
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open punch log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row {line}: unrecognized timestamp '{value}'")]
    BadTimestamp { line: u64, value: String },

    #[error("Row {line}: empty AC-No.")]
    MissingIdentifier { line: u64 },
}

#[derive(Debug, Deserialize)]
struct PunchRow {
    #[serde(rename = "AC-No.")]
    ac_no: String,
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "State")]
    state: String,
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Reads punch rows from CSV with an `AC-No.`, `Time`, `State` header.
/// Other columns are ignored, as are rows whose state is neither in nor out.
pub fn read_punches<R: Read>(reader: R) -> Result<Vec<PunchEvent>, SourceError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut events = Vec::new();
    let mut skipped = 0usize;
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let row: PunchRow = record.deserialize(Some(&headers))?;

        let Some(direction) = Direction::from_state(&row.state) else {
            skipped += 1;
            continue;
        };
        if row.ac_no.is_empty() {
            return Err(SourceError::MissingIdentifier { line });
        }
        let timestamp = parse_timestamp(&row.time).ok_or_else(|| SourceError::BadTimestamp {
            line,
            value: row.time.clone(),
        })?;

        events.push(PunchEvent {
            identifier: row.ac_no,
            timestamp,
            direction,
        });
    }

    if skipped > 0 {
        debug!("Skipped {} rows with an unrecognized state", skipped);
    }
    Ok(events)
}

pub fn read_punch_file(path: &Path) -> Result<Vec<PunchEvent>, SourceError> {
    let file = std::fs::File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let events = read_punches(file)?;
    info!("Read {} punches from {}", events.len(), path.display());
    Ok(events)
}

#[cfg(test)]
mod punch_source_tests {
    use super::*;

    #[test]
    fn reads_in_and_out_rows_and_ignores_extra_columns() {
        let data = "\
No.,AC-No.,Name,Time,State
1,1001,Ada,2024-05-02 08:00:00,C/In
2,1001,Ada,2024-05-02 17:30:00,C/Out
";
        let events = read_punches(data.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].identifier, "1001");
        assert_eq!(events[0].direction, Direction::In);
        assert_eq!(events[1].direction, Direction::Out);
    }

    #[test]
    fn skips_rows_with_other_states() {
        let data = "\
AC-No.,Time,State
1001,2024-05-02 12:00:00,Break Out
1001,2024-05-02 08:00:00,c/in
";
        let events = read_punches(data.as_bytes()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::In);
    }

    #[test]
    fn reports_the_row_of_a_bad_timestamp() {
        let data = "\
AC-No.,Time,State
1001,2024-05-02 08:00:00,C/In
1001,yesterday,C/Out
";
        match read_punches(data.as_bytes()) {
            Err(SourceError::BadTimestamp { line, value }) => {
                assert_eq!(line, 3);
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected BadTimestamp, got {:?}", other),
        }
    }

    #[test]
    fn accepts_us_style_timestamps_with_meridiem() {
        let parsed = parse_timestamp("5/2/2024 5:30 PM").unwrap();
        assert_eq!(parsed.to_string(), "2024-05-02 17:30:00");
    }

    #[test]
    fn missing_state_column_is_a_csv_error() {
        let data = "AC-No.,Time\n1001,2024-05-02 08:00:00\n";
        assert!(matches!(read_punches(data.as_bytes()), Err(SourceError::Csv(_))));
    }
}
