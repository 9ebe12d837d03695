// src/sessions.rs

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::punches::{Direction, PunchEvent};

/// First check-in and last check-out of one employee on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSession {
    pub identifier: String,
    pub date: NaiveDate,
    pub check_in: NaiveDateTime,
    pub check_out: NaiveDateTime,
    pub duration_hours: f64,
}

impl AttendanceSession {
    fn from_bounds(identifier: String, date: NaiveDate, check_in: NaiveDateTime, check_out: NaiveDateTime) -> Self {
        let duration_hours = (check_out - check_in).num_seconds() as f64 / 3600.0;
        Self {
            identifier,
            date,
            check_in,
            check_out,
            duration_hours,
        }
    }
}

#[derive(Debug, Default)]
struct DayBounds {
    first_in: Option<NaiveDateTime>,
    last_out: Option<NaiveDateTime>,
}

impl DayBounds {
    fn add(&mut self, punch: &PunchEvent) {
        match punch.direction {
            Direction::In => {
                self.first_in = Some(match self.first_in {
                    Some(current) => current.min(punch.timestamp),
                    None => punch.timestamp,
                });
            }
            Direction::Out => {
                self.last_out = Some(match self.last_out {
                    Some(current) => current.max(punch.timestamp),
                    None => punch.timestamp,
                });
            }
        }
    }
}

/// Collapses punches into one session per `(identifier, calendar date)`.
///
/// Groups are keyed on the date part of each timestamp, so a shift that
/// crosses midnight splits into two partial days. A day yields a session only
/// when it has an IN, an OUT, and the first IN precedes the last OUT; other
/// days are dropped without error. Output is sorted by identifier, then date.
pub fn aggregate_sessions(punches: &[PunchEvent]) -> Vec<AttendanceSession> {
    let mut days: BTreeMap<(String, NaiveDate), DayBounds> = BTreeMap::new();
    for punch in punches {
        days.entry((punch.identifier.clone(), punch.timestamp.date()))
            .or_default()
            .add(punch);
    }

    let group_count = days.len();
    let sessions: Vec<AttendanceSession> = days
        .into_iter()
        .filter_map(|((identifier, date), bounds)| match (bounds.first_in, bounds.last_out) {
            (Some(check_in), Some(check_out)) if check_in < check_out => Some(
                AttendanceSession::from_bounds(identifier, date, check_in, check_out),
            ),
            _ => None,
        })
        .collect();

    debug!(
        "Aggregated {} punches into {} sessions ({} incomplete days dropped)",
        punches.len(),
        sessions.len(),
        group_count - sessions.len()
    );
    sessions
}
