//! Error types for extract ingestion.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors that can occur while streaming an extract.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Extract file not found.
    #[error("extract file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read or parse a CSV record.
    #[error("failed to read CSV {path}: {source}")]
    CsvRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Required column not found in the extract header.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// Chunk size must be at least one row.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<PolarsError> for IngestError {
    fn from(err: PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
