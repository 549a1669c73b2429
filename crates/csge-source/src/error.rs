//! Error types for the metadata source.

use std::path::PathBuf;

use csge_model::{ModelError, ProductId};
use thiserror::Error;

use crate::Lang;

/// Errors raised while talking to the metadata source or locating extracts.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success HTTP status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The service answered, but flagged the request as failed.
    #[error("{request} returned status {status}")]
    NotSuccess { request: String, status: String },

    /// The response payload did not have the expected shape.
    #[error("could not decode {request} response: {source}")]
    Decode {
        request: String,
        #[source]
        source: serde_json::Error,
    },

    /// Cube metadata is present but unusable for indicator generation.
    #[error("malformed metadata for product {product_id}: {reason}")]
    MalformedMetadata {
        product_id: ProductId,
        reason: String,
    },

    /// No metadata is known for the product.
    #[error("no metadata available for product {0}")]
    UnknownProduct(ProductId),

    /// The unzipped full-table extract is not where it is expected.
    #[error("extract for product {product_id} ({lang}) not found at {path}")]
    ExtractMissing {
        product_id: ProductId,
        lang: Lang,
        path: PathBuf,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl SourceError {
    /// True when the failure is a metadata content problem rather than I/O.
    pub fn is_malformed_metadata(&self) -> bool {
        matches!(self, Self::MalformedMetadata { .. } | Self::Model(_))
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
