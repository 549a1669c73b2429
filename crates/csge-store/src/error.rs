use std::path::PathBuf;

use csge_model::Table;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Rows do not match the table's column set.
    #[error("rows for {table} do not match its schema: {reason}")]
    SchemaMismatch { table: Table, reason: String },

    /// A surrogate key is already present in the table.
    #[error("duplicate {table} key {id}")]
    DuplicateKey { table: Table, id: i64 },

    /// A non-empty write reported zero rows written.
    #[error("write of {rows} rows to {table} wrote nothing")]
    NothingWritten { table: Table, rows: usize },

    #[error("{table} has no numeric id column")]
    NoIdColumn { table: Table },

    #[error("{table} rows are not owned by a product rebuild")]
    NotDerived { table: Table },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid {column} value {value:?} in {path}")]
    InvalidValue {
        path: PathBuf,
        column: String,
        value: String,
    },

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<PolarsError> for StoreError {
    fn from(err: PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
