//! Code and metadata resolution for statistical products.
//!
//! The remote Web Data Service is consumed through [`MetadataProvider`];
//! full-table extracts through [`ExtractSource`]. Both are narrow so tests
//! and dry runs can substitute in-memory fixtures.

pub mod error;
pub mod extract;
pub mod provider;
pub mod resolver;
pub mod wds;

pub use error::{Result, SourceError};
pub use extract::{ExtractDirectory, ExtractSource, Lang};
pub use provider::{InMemoryProvider, MetadataProvider};
pub use resolver::{ProductDescriptor, describe, reference_years, resolve_product};
pub use wds::{
    CodeSets, CodeValue, CubeMetadata, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, FrequencyEntry,
    SubjectEntry, UomCode, WdsClient, WdsDimension, WdsMember,
};
