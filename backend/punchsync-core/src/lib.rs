// src/lib.rs

pub mod directory;
pub mod import;
pub mod odoo_client;
pub mod outcome;
pub mod punches;
pub mod reconcile;
pub mod report;
pub mod sessions;
pub mod workflow;

#[cfg(test)]
mod mock_directory;

mod import_tests;
