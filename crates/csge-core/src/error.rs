//! Error types for indicator construction and product rebuilds.

use csge_ingest::IngestError;
use csge_model::{ProductId, Table};
use csge_registry::RegistryError;
use csge_source::SourceError;
use csge_store::StoreError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Broad failure classes a worklist driver reacts to.
///
/// Unresolved references are not errors; they are collected in the run's
/// warning log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A table write or delete failed; the product run stopped.
    InsertFailure,
    /// Metadata was unusable; nothing was touched.
    MalformedMetadata,
    /// Invalid request or registry state; nothing was touched.
    Config,
    /// The metadata service could not be reached or answered badly.
    Source,
    /// An extract could not be read.
    Io,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Dimension axes produced lists of different lengths.
    #[error("malformed metadata for product {product_id}: {reason}")]
    MalformedMetadata { product_id: ProductId, reason: String },

    #[error("writing {table} for product {product_id} failed{}", batch_suffix(.batch))]
    InsertFailed {
        table: Table,
        product_id: ProductId,
        batch: Option<usize>,
        #[source]
        source: StoreError,
    },

    #[error("deleting {table} rows for product {product_id} failed")]
    DeleteFailed {
        table: Table,
        product_id: ProductId,
        #[source]
        source: StoreError,
    },

    #[error("no product ids were given")]
    EmptyRequest,

    #[error("product {product_id} already exists")]
    ProductExists { product_id: ProductId },

    #[error("product {product_id} has not been inserted; use -i to create it")]
    ProductNotLoaded { product_id: ProductId },

    #[error("master {master} has no indicators to attach sibling {product_id} to")]
    MasterNotLoaded {
        product_id: ProductId,
        master: ProductId,
    },

    #[error("skipped: master {master} of this group failed")]
    MasterFailed { master: ProductId },

    #[error("dataframe error: {message}")]
    DataFrame { message: String },
}

impl From<PolarsError> for CoreError {
    fn from(err: PolarsError) -> Self {
        CoreError::DataFrame {
            message: err.to_string(),
        }
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Source(err) if err.is_malformed_metadata() => ErrorKind::MalformedMetadata,
            Self::Source(SourceError::ExtractMissing { .. }) => ErrorKind::Io,
            Self::Source(_) => ErrorKind::Source,
            Self::Ingest(_) => ErrorKind::Io,
            Self::MalformedMetadata { .. } => ErrorKind::MalformedMetadata,
            Self::Registry(_)
            | Self::EmptyRequest
            | Self::ProductExists { .. }
            | Self::ProductNotLoaded { .. }
            | Self::MasterNotLoaded { .. }
            | Self::MasterFailed { .. } => ErrorKind::Config,
            Self::Store(_)
            | Self::InsertFailed { .. }
            | Self::DeleteFailed { .. }
            | Self::DataFrame { .. } => ErrorKind::InsertFailure,
        }
    }
}

fn batch_suffix(batch: &Option<usize>) -> String {
    batch.map(|b| format!(" in batch {b}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, CoreError>;
