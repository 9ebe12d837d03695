// src/outcome.rs

use serde::Serialize;

/// Identifiers that failed with the same error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorGroup {
    pub message: String,
    pub identifiers: Vec<String>,
}

/// Success and failure counts for a batch of remote calls, with failures
/// grouped by message in order of first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeTally {
    pub successes: usize,
    pub failures: usize,
    pub errors: Vec<ErrorGroup>,
}

impl OutcomeTally {
    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    pub fn record_failure(&mut self, message: &str, identifier: &str) {
        self.failures += 1;
        match self.errors.iter_mut().find(|g| g.message == message) {
            Some(group) => group.identifiers.push(identifier.to_string()),
            None => self.errors.push(ErrorGroup {
                message: message.to_string(),
                identifiers: vec![identifier.to_string()],
            }),
        }
    }

    pub fn attempted(&self) -> usize {
        self.successes + self.failures
    }

    pub fn identifiers_for(&self, message: &str) -> Option<&[String]> {
        self.errors
            .iter()
            .find(|g| g.message == message)
            .map(|g| g.identifiers.as_slice())
    }
}
