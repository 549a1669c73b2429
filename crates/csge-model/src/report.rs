//! Per-product run reporting.
//!
//! Unresolved references are never fatal: they are collected here during a
//! product run and reported once at the end.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{MergeRole, ProductId};

/// What kind of reference failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnresolvedKind {
    /// Geography identifier not present in the geography reference set.
    Geography,
    /// Extract row whose indicator code is not in the indicator set.
    IndicatorCode,
    /// Indicator whose members have no persisted dimension value rows.
    DimensionKey,
    /// Reference period that could not be normalised to a year.
    ReferencePeriod,
}

impl UnresolvedKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Geography => "geography",
            Self::IndicatorCode => "indicator code",
            Self::DimensionKey => "dimension key",
            Self::ReferencePeriod => "reference period",
        }
    }
}

impl fmt::Display for UnresolvedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A sibling reported a different unit of measure than its master for the
/// same indicator. The master's unit is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConflict {
    pub indicator_code: String,
    pub master_uom: String,
    pub sibling_uom: String,
}

/// Accumulated non-fatal warnings for one product run.
///
/// Each distinct unresolved id is one entry; repeated occurrences only bump
/// its count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarningLog {
    unresolved: BTreeMap<(UnresolvedKind, String), usize>,
    unit_conflicts: Vec<UnitConflict>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: UnresolvedKind, id: impl Into<String>) {
        *self.unresolved.entry((kind, id.into())).or_insert(0) += 1;
    }

    pub fn record_unit_conflict(&mut self, conflict: UnitConflict) {
        self.unit_conflicts.push(conflict);
    }

    /// Distinct unresolved ids of one kind, in sorted order.
    pub fn unresolved(&self, kind: UnresolvedKind) -> Vec<&str> {
        self.unresolved
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, id)| id.as_str())
            .collect()
    }

    /// Iterate `(kind, id, occurrences)` over every entry.
    pub fn entries(&self) -> impl Iterator<Item = (UnresolvedKind, &str, usize)> {
        self.unresolved
            .iter()
            .map(|((kind, id), count)| (*kind, id.as_str(), *count))
    }

    pub fn unit_conflicts(&self) -> &[UnitConflict] {
        &self.unit_conflicts
    }

    pub fn entry_count(&self) -> usize {
        self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unresolved.is_empty() && self.unit_conflicts.is_empty()
    }

    pub fn merge(&mut self, other: WarningLog) {
        for (key, count) in other.unresolved {
            *self.unresolved.entry(key).or_insert(0) += count;
        }
        self.unit_conflicts.extend(other.unit_conflicts);
    }
}

/// Row counts written for each derived table by one product run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub indicators: usize,
    pub indicator_values: usize,
    pub geography_references: usize,
    pub geographic_levels: usize,
    pub metadata: usize,
    pub related_charts: usize,
}

/// Outcome of one product's rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductReport {
    pub product_id: ProductId,
    pub role: MergeRole,
    /// Product id the rows were published under.
    pub functional_product_id: ProductId,
    pub counts: TableCounts,
    pub batches: usize,
    pub rows_read: usize,
    pub warnings: WarningLog,
}

impl ProductReport {
    pub fn new(product_id: ProductId, role: MergeRole) -> Self {
        let functional_product_id = role.functional_product_id(product_id);
        Self {
            product_id,
            role,
            functional_product_id,
            counts: TableCounts::default(),
            batches: 0,
            rows_read: 0,
            warnings: WarningLog::new(),
        }
    }
}
