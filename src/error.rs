//! Error types for the matching engine
//!
//! Only malformed configuration and snapshot ingest are hard failures.
//! Everything else degrades to empty results or neutral scores.

use thiserror::Error;

/// Errors surfaced by the matching engine
#[derive(Debug, Error)]
pub enum MatchError {
    /// Cycle finder options are out of range
    #[error("Invalid cycle options: {0}")]
    InvalidCycleOptions(String),

    /// Chain scoring weights or thresholds are out of range
    #[error("Invalid chain scoring options: {0}")]
    InvalidScoringOptions(String),

    /// Snapshot file could not be read
    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not valid JSON for the expected shape
    #[error("Failed to parse snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    /// A date in the snapshot could not be parsed
    #[error("Invalid date '{0}': expected RFC 3339 or YYYY-MM-DD")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, MatchError>;
