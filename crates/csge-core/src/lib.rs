//! Indicator construction and product rebuilds.
//!
//! A product's published identity is the Cartesian product of its
//! classification members and reference years ([`combinatorics`]). Observations
//! from the full-table extract are joined to that identity in bounded batches
//! ([`transform`]) and the presentation rows are derived last ([`metadata`]).
//! [`rebuild`] drives the whole sequence for a merge group.

pub mod combinatorics;
pub mod error;
pub mod geography;
pub mod indicator_code;
pub mod indicators;
pub mod insert;
pub mod merge;
pub mod metadata;
pub mod rebuild;
pub mod sequence;
pub mod transform;
pub mod worklist;

pub use combinatorics::{
    Axis, Combination, IndicatorCandidate, combine_axes, generate_candidates, select_candidates,
};
pub use error::{CoreError, ErrorKind, Result};
pub use geography::{GeographyRules, geographic_level, repair_dguid};
pub use indicator_code::{fix_ref_year, generic_code, indicator_code};
pub use indicators::PublishedIndicator;
pub use insert::{CreatedProduct, create_product};
pub use merge::{LevelFilter, RunPlan, YearPolicy};
pub use rebuild::{
    ProductOutcome, RebuildOptions, Rebuilder, delete_product_rows, extract_reference_years,
};
pub use sequence::IdSequence;
pub use transform::{ChunkPipeline, IndicatorIndex, ReferenceSets, TransformedBatch};
pub use worklist::changed_products;
