//! Relational store for derived indicator tables.
//!
//! [`RelationalStore`] is the narrow surface the loader writes through.
//! [`MemoryStore`] keeps tables as Polars frames; [`FrameStore`] persists the
//! same frames as one CSV per table in a directory.

pub mod error;
pub mod frame_store;
pub mod frames;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use frame_store::FrameStore;
pub use frames::{conform, empty_frame};
pub use memory::MemoryStore;
pub use store::{
    CuratedMetadata, DimensionValueRecord, IndicatorKey, InsertOutcome, RelationalStore,
};
