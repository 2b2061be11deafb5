//! Records and reporting for the Academia Maestro music school.
//!
//! The store lives in SQLite (`db`), the read-only analytics in `reports`,
//! and the terminal dashboard in `ui`. The `bin` target wires them together
//! through `cli`.
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod reports;
pub mod ui;

/// Opening and preparing a store.
pub use db::{ensure_schema, open_in_memory_store, open_store, seed_reference_data};

pub use error::{ReportError, ReportResult};
pub use reports::{DateRange, ReportCategory, ReportData, ReportRequest};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
