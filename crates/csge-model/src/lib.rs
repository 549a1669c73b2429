pub mod dimension;
pub mod error;
pub mod ids;
pub mod merge;
pub mod report;
pub mod tables;

pub use dimension::{Dimension, DimensionMember, DimensionType, UnitOfMeasure};
pub use error::{ModelError, Result};
pub use ids::{Frequency, ProductId, SubjectCode};
pub use merge::MergeRole;
pub use report::{ProductReport, TableCounts, UnitConflict, UnresolvedKind, WarningLog};
pub use tables::{ColumnDef, ColumnKind, Table, columns};
