// src/mock_directory.rs

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tracing::debug;

use crate::directory::{EmployeeRef, RecordRef, RemoteDirectory, RemoteError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Resolve(String),
    CreateEmployee { identifier: String, name: String },
    CreateAttendance {
        identifier: String,
        check_in: NaiveDateTime,
        check_out: Option<NaiveDateTime>,
    },
}

#[derive(Default)]
struct MockState {
    employees: BTreeMap<String, i64>,
    next_id: i64,
    next_record: i64,
    calls: Vec<RemoteCall>,
}

/// In-memory directory that records every call in order and fails on demand.
#[derive(Default)]
pub struct MockDirectory {
    state: Mutex<MockState>,
    lookup_failures: HashMap<String, String>,
    creation_failures: HashMap<String, String>,
    attendance_failures: HashMap<String, String>,
    // Creation reports success but the employee never becomes resolvable
    phantom_creations: HashSet<String>,
}

impl MockDirectory {
    pub fn with_employees(identifiers: &[&str]) -> Self {
        let directory = Self::default();
        {
            let mut state = directory.state.lock().unwrap();
            for identifier in identifiers {
                state.next_id += 1;
                let id = state.next_id;
                state.employees.insert(identifier.to_string(), id);
            }
        }
        directory
    }

    pub fn fail_lookup(mut self, identifier: &str, message: &str) -> Self {
        self.lookup_failures
            .insert(identifier.to_string(), message.to_string());
        self
    }

    pub fn fail_creation(mut self, identifier: &str, message: &str) -> Self {
        self.creation_failures
            .insert(identifier.to_string(), message.to_string());
        self
    }

    pub fn fail_attendance(mut self, identifier: &str, message: &str) -> Self {
        self.attendance_failures
            .insert(identifier.to_string(), message.to_string());
        self
    }

    pub fn phantom_creation(mut self, identifier: &str) -> Self {
        self.phantom_creations.insert(identifier.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn attendance_calls(&self) -> Vec<RemoteCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, RemoteCall::CreateAttendance { .. }))
            .collect()
    }

    pub fn count_lookups(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RemoteCall::Resolve(_)))
            .count()
    }

    pub fn knows(&self, identifier: &str) -> bool {
        self.state.lock().unwrap().employees.contains_key(identifier)
    }
}

#[async_trait]
impl RemoteDirectory for MockDirectory {
    async fn resolve_employee(&self, identifier: &str) -> Result<Option<EmployeeRef>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RemoteCall::Resolve(identifier.to_string()));
        if let Some(message) = self.lookup_failures.get(identifier) {
            return Err(RemoteError::backend(message.clone()));
        }
        Ok(state.employees.get(identifier).map(|id| EmployeeRef(*id)))
    }

    async fn create_employee(
        &self,
        identifier: &str,
        display_name: &str,
    ) -> Result<EmployeeRef, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RemoteCall::CreateEmployee {
            identifier: identifier.to_string(),
            name: display_name.to_string(),
        });
        if let Some(message) = self.creation_failures.get(identifier) {
            return Err(RemoteError::backend(message.clone()));
        }
        state.next_id += 1;
        let id = state.next_id;
        if !self.phantom_creations.contains(identifier) {
            state.employees.insert(identifier.to_string(), id);
        }
        debug!("Mock created employee {} as {}", identifier, id);
        Ok(EmployeeRef(id))
    }

    async fn create_attendance_session(
        &self,
        employee: EmployeeRef,
        check_in: NaiveDateTime,
        check_out: Option<NaiveDateTime>,
    ) -> Result<RecordRef, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let identifier = state
            .employees
            .iter()
            .find(|(_, id)| **id == employee.0)
            .map(|(identifier, _)| identifier.clone())
            .unwrap_or_default();
        state.calls.push(RemoteCall::CreateAttendance {
            identifier: identifier.clone(),
            check_in,
            check_out,
        });
        if let Some(message) = self.attendance_failures.get(&identifier) {
            return Err(RemoteError::backend(message.clone()));
        }
        state.next_record += 1;
        Ok(RecordRef(state.next_record))
    }
}
