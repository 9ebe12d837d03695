// src/directory.rs

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire format for attendance timestamps. No timezone marker is sent; the
/// backend reads the value in its own configured timezone.
pub const REMOTE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Id of an `hr.employee` record in the remote directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeRef(pub i64);

/// Id of an `hr.attendance` record in the remote directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef(pub i64);

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Odoo returned HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Unexpected response payload: {0}")]
    UnexpectedPayload(String),

    // Backend-reported errors keep the server's wording so they can be grouped
    #[error("{message}")]
    Backend { message: String },
}

impl RemoteError {
    pub fn backend<S: Into<String>>(message: S) -> Self {
        RemoteError::Backend {
            message: message.into(),
        }
    }
}

/// The remote employee directory as seen by the reconciliation pipeline.
///
/// Every call is one round trip to the backend. Callers await them one at a
/// time so requests reach the backend in program order.
#[async_trait]
pub trait RemoteDirectory: Send + Sync {
    /// Finds the employee whose badge (barcode) equals `identifier`.
    /// Returns the first match, or `None` when there is none.
    async fn resolve_employee(&self, identifier: &str) -> Result<Option<EmployeeRef>, RemoteError>;

    /// Creates an employee keyed by `identifier`, which doubles as the
    /// placeholder PIN. Does not check for an existing employee first.
    async fn create_employee(
        &self,
        identifier: &str,
        display_name: &str,
    ) -> Result<EmployeeRef, RemoteError>;

    async fn create_attendance_session(
        &self,
        employee: EmployeeRef,
        check_in: NaiveDateTime,
        check_out: Option<NaiveDateTime>,
    ) -> Result<RecordRef, RemoteError>;
}

pub fn format_remote_datetime(dt: &NaiveDateTime) -> String {
    dt.format(REMOTE_DATETIME_FORMAT).to_string()
}
