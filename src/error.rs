//! Typed failures raised while loading a transaction export.
//!
//! Loader-level errors abort the pipeline. Aggregation never fails: empty
//! segments and zero denominators resolve to well-defined zero/empty values.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source {path:?} is unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("required column(s) missing: {} (found: {})", .missing.join(", "), .found.join(", "))]
    SchemaMismatch {
        missing: Vec<String>,
        found: Vec<String>,
    },
    #[error("row {row} column '{column}': value '{value}' {reason}")]
    MalformedRecord {
        row: usize,
        column: &'static str,
        value: String,
        reason: &'static str,
    },
    #[error("row {row}: expected {expected} field(s), found {found}")]
    FieldCount {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row}: bytes are not valid {encoding}")]
    Decode { row: usize, encoding: &'static str },
    #[error("row {row}: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },
}

impl PipelineError {
    /// Failures confined to one data row; `MalformedPolicy::Skip` excludes
    /// the row instead of aborting.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            PipelineError::MalformedRecord { .. }
                | PipelineError::FieldCount { .. }
                | PipelineError::Decode { .. }
        )
    }
}
