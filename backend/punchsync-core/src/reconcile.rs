// src/reconcile.rs

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{info, warn};

use crate::directory::{RemoteDirectory, RemoteError};
use crate::outcome::OutcomeTally;

pub fn default_display_name(identifier: &str) -> String {
    format!("Employee {}", identifier)
}

/// Partition of badge ids into those the directory resolves and those it
/// does not. Every input id lands in exactly one side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub known: BTreeSet<String>,
    pub unknown: BTreeSet<String>,
}

impl Classification {
    pub fn is_complete(&self) -> bool {
        self.unknown.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionDecision {
    /// Create the unknown employees. Ids missing from the map get the default name.
    ResolveNow(BTreeMap<String, String>),
    Defer,
}

/// Asks whoever runs the import what to do about unknown badge ids.
pub trait ResolutionPrompt {
    fn decide(&mut self, unknown: &BTreeSet<String>) -> io::Result<ResolutionDecision>;
}

/// Interactive prompt on a line-oriented reader and writer (stdin/stdout in
/// the binary).
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// `None` on end of input.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> ResolutionPrompt for TerminalPrompt<R, W> {
    fn decide(&mut self, unknown: &BTreeSet<String>) -> io::Result<ResolutionDecision> {
        writeln!(
            self.output,
            "\n⚠️ WARNING: The following employees need to be created in Odoo first:"
        )?;
        writeln!(self.output, "\nMissing Employees (Badge IDs):")?;
        for identifier in unknown {
            writeln!(self.output, "- {}", identifier)?;
        }

        let create = loop {
            match self.ask("\nWould you like to create these employees now? (yes/no): ")? {
                None => break false,
                Some(answer) => match answer.to_lowercase().as_str() {
                    "yes" | "y" => break true,
                    "no" | "n" => break false,
                    _ => writeln!(self.output, "Please enter 'yes' or 'no'")?,
                },
            }
        };
        if !create {
            return Ok(ResolutionDecision::Defer);
        }

        let mut names = BTreeMap::new();
        for identifier in unknown {
            let default_name = default_display_name(identifier);
            let question = format!(
                "\nEnter name for employee with Badge ID {} (or press Enter to use '{}'): ",
                identifier, default_name
            );
            let name = match self.ask(&question)? {
                Some(name) if !name.is_empty() => name,
                _ => default_name,
            };
            names.insert(identifier.clone(), name);
        }
        Ok(ResolutionDecision::ResolveNow(names))
    }
}

/// Creates every unknown employee under its default name.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoCreate;

impl ResolutionPrompt for AutoCreate {
    fn decide(&mut self, unknown: &BTreeSet<String>) -> io::Result<ResolutionDecision> {
        Ok(ResolutionDecision::ResolveNow(
            unknown
                .iter()
                .map(|id| (id.clone(), default_display_name(id)))
                .collect(),
        ))
    }
}

/// Never creates employees.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclineAll;

impl ResolutionPrompt for DeclineAll {
    fn decide(&mut self, _unknown: &BTreeSet<String>) -> io::Result<ResolutionDecision> {
        Ok(ResolutionDecision::Defer)
    }
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Employee lookup failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Failed to read resolution decision: {0}")]
    Prompt(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    Declined,
    CreationLeftGaps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Every identifier resolves. `creation` is set when employees were
    /// created on the way.
    Complete {
        known: BTreeSet<String>,
        creation: Option<OutcomeTally>,
    },
    /// Some identifiers still do not resolve; nothing may be imported.
    Incomplete {
        unknown: BTreeSet<String>,
        reason: IncompleteReason,
        creation: Option<OutcomeTally>,
    },
}

pub struct Reconciler<'a> {
    directory: &'a dyn RemoteDirectory,
}

impl<'a> Reconciler<'a> {
    pub fn new(directory: &'a dyn RemoteDirectory) -> Self {
        Self { directory }
    }

    /// Looks up each identifier once. Any lookup failure fails the whole
    /// classification; partial results are discarded.
    pub async fn classify(
        &self,
        identifiers: &BTreeSet<String>,
    ) -> Result<Classification, RemoteError> {
        let mut classification = Classification::default();
        for identifier in identifiers {
            match self.directory.resolve_employee(identifier).await? {
                Some(_) => classification.known.insert(identifier.clone()),
                None => classification.unknown.insert(identifier.clone()),
            };
        }
        info!(
            "Classified {} badge ids: {} known, {} unknown",
            identifiers.len(),
            classification.known.len(),
            classification.unknown.len()
        );
        Ok(classification)
    }

    /// Creates one employee per unknown identifier. Failures are recorded and
    /// the remaining identifiers are still attempted.
    pub async fn create_missing(
        &self,
        unknown: &BTreeSet<String>,
        names: &BTreeMap<String, String>,
    ) -> OutcomeTally {
        let mut tally = OutcomeTally::default();
        for identifier in unknown {
            let name = names
                .get(identifier)
                .cloned()
                .unwrap_or_else(|| default_display_name(identifier));
            match self.directory.create_employee(identifier, &name).await {
                Ok(employee) => {
                    tally.record_success();
                    info!(
                        "✓ Created employee: {} (Badge ID: {}, id {})",
                        name, identifier, employee.0
                    );
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(
                        "✗ Error creating employee with Badge ID {}: {}",
                        identifier, message
                    );
                    tally.record_failure(&message, identifier);
                }
            }
        }
        tally
    }

    /// Classifies, lets `prompt` decide about unknown ids, creates the ones it
    /// approves and classifies again from scratch.
    pub async fn reconcile(
        &self,
        identifiers: &BTreeSet<String>,
        prompt: &mut dyn ResolutionPrompt,
    ) -> Result<Reconciliation, ReconcileError> {
        let first = self.classify(identifiers).await?;
        if first.is_complete() {
            return Ok(Reconciliation::Complete {
                known: first.known,
                creation: None,
            });
        }

        let names = match prompt.decide(&first.unknown)? {
            ResolutionDecision::Defer => {
                info!("Employee creation declined for {} badge ids", first.unknown.len());
                return Ok(Reconciliation::Incomplete {
                    unknown: first.unknown,
                    reason: IncompleteReason::Declined,
                    creation: None,
                });
            }
            ResolutionDecision::ResolveNow(names) => names,
        };

        let creation = self.create_missing(&first.unknown, &names).await;

        // Creation results are not trusted; only a fresh lookup counts.
        let second = self.classify(identifiers).await?;
        if second.is_complete() {
            Ok(Reconciliation::Complete {
                known: second.known,
                creation: Some(creation),
            })
        } else {
            Ok(Reconciliation::Incomplete {
                unknown: second.unknown,
                reason: IncompleteReason::CreationLeftGaps,
                creation: Some(creation),
            })
        }
    }
}
