//! Errors surfaced by the reporting layer.
//!
//! Empty tables, unparseable dates and dangling foreign keys are not errors:
//! they only shrink the result. What reaches the caller is either a bad
//! parameter, rejected before any query runs, or a failure of SQLite itself.

use thiserror::Error;

pub type ReportResult<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    /// A range bound was not an ISO-8601 `YYYY-MM-DD` date.
    #[error("invalid date {value:?}: expected YYYY-MM-DD")]
    InvalidDate { value: String },

    /// `top_n` must be a non-negative integer.
    #[error("invalid top_n {value:?}: expected a non-negative integer")]
    InvalidTopN { value: String },

    #[error("record store query failed: {0}")]
    Store(#[from] rusqlite::Error),
}
