//! Chunked ingestion of full-table CSV extracts.

pub mod error;
pub mod reader;

pub use error::{IngestError, Result};
pub use reader::{DEFAULT_CHUNK_SIZE, ExtractOptions, ExtractReader, extract_columns};
