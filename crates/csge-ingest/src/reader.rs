//! Chunked extract reader.
//!
//! Full-table extracts run to tens of millions of rows, so they are never
//! loaded whole. [`ExtractReader`] streams records with the `csv` crate and
//! hands them out as Polars `DataFrame`s of at most `chunk_size` rows, every
//! column kept as text. Only one chunk is alive at a time.
//!
//! # Usage
//!
//! ```ignore
//! use csge_ingest::{ExtractOptions, ExtractReader};
//!
//! let mut reader = ExtractReader::open(&path, ExtractOptions::default())?;
//! while let Some(batch) = reader.next_batch()? {
//!     // transform and flush before reading the next one
//! }
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::{Column, DataFrame};
use tracing::debug;

use csge_common::str_column;

use crate::error::{IngestError, Result};

/// Column names of the English full-table extract.
pub mod extract_columns {
    pub const REF_DATE: &str = "REF_DATE";
    pub const DGUID: &str = "DGUID";
    pub const UOM: &str = "UOM";
    pub const UOM_ID: &str = "UOM_ID";
    pub const VECTOR: &str = "VECTOR";
    pub const COORDINATE: &str = "COORDINATE";
    pub const STATUS: &str = "STATUS";
    pub const SYMBOL: &str = "SYMBOL";
    pub const VALUE: &str = "VALUE";

    /// Columns the transform pipeline reads.
    pub const REQUIRED: [&str; 7] = [REF_DATE, DGUID, UOM, UOM_ID, COORDINATE, STATUS, VALUE];
}

/// Default number of rows per batch.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Options for chunked extract reading.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Rows per batch. Tuning only; results do not depend on it.
    pub chunk_size: usize,
    pub delimiter: u8,
    /// Columns to keep. All header columns are kept when empty.
    pub columns: Vec<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            delimiter: b',',
            columns: extract_columns::REQUIRED
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
        }
    }
}

impl ExtractOptions {
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// Streaming reader yielding bounded row batches.
pub struct ExtractReader {
    path: PathBuf,
    reader: csv::Reader<File>,
    /// (header index, column name) of the kept columns.
    selected: Vec<(usize, String)>,
    chunk_size: usize,
    record: csv::StringRecord,
    batches_read: usize,
    rows_read: usize,
    finished: bool,
}

impl ExtractReader {
    /// Open an extract and validate its header.
    pub fn open(path: impl AsRef<Path>, options: ExtractOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(IngestError::FileNotFound { path });
        }
        if options.chunk_size == 0 {
            return Err(IngestError::InvalidChunkSize);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(options.delimiter)
            .from_path(&path)
            .map_err(|source| IngestError::CsvRead {
                path: path.clone(),
                source,
            })?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| IngestError::CsvRead {
                path: path.clone(),
                source,
            })?
            .iter()
            .map(normalize_header)
            .collect();

        let selected = if options.columns.is_empty() {
            headers.iter().cloned().enumerate().collect()
        } else {
            let mut selected = Vec::with_capacity(options.columns.len());
            for column in &options.columns {
                let index = headers
                    .iter()
                    .position(|h| h == column)
                    .ok_or_else(|| IngestError::MissingColumn {
                        column: column.clone(),
                        path: path.clone(),
                    })?;
                selected.push((index, column.clone()));
            }
            selected
        };

        Ok(Self {
            path,
            reader,
            selected,
            chunk_size: options.chunk_size,
            record: csv::StringRecord::new(),
            batches_read: 0,
            rows_read: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.selected.iter().map(|(_, name)| name.as_str()).collect()
    }

    pub fn batches_read(&self) -> usize {
        self.batches_read
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Read the next batch, or `None` once the extract is exhausted.
    pub fn next_batch(&mut self) -> Result<Option<DataFrame>> {
        if self.finished {
            return Ok(None);
        }

        let mut buffers: Vec<Vec<String>> = self
            .selected
            .iter()
            .map(|_| Vec::with_capacity(self.chunk_size))
            .collect();
        let mut rows = 0;
        while rows < self.chunk_size {
            let more = self
                .reader
                .read_record(&mut self.record)
                .map_err(|source| IngestError::CsvRead {
                    path: self.path.clone(),
                    source,
                })?;
            if !more {
                self.finished = true;
                break;
            }
            for ((index, _), buffer) in self.selected.iter().zip(buffers.iter_mut()) {
                buffer.push(self.record.get(*index).unwrap_or_default().to_string());
            }
            rows += 1;
        }

        if rows == 0 {
            return Ok(None);
        }

        let columns: Vec<Column> = self
            .selected
            .iter()
            .zip(buffers)
            .map(|((_, name), values)| str_column(name, values))
            .collect();
        let batch = DataFrame::new(columns)?;

        self.batches_read += 1;
        self.rows_read += rows;
        debug!(
            batch = self.batches_read,
            rows,
            total = self.rows_read,
            "Read extract batch"
        );
        Ok(Some(batch))
    }
}

impl Iterator for ExtractReader {
    type Item = Result<DataFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}

/// Strip the byte-order mark and quotes some extracts carry in the header.
fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .trim_matches('"')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header_strips_bom() {
        assert_eq!(normalize_header("\u{feff}\"REF_DATE\""), "REF_DATE");
        assert_eq!(normalize_header(" DGUID "), "DGUID");
    }
}
