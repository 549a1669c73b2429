//! Chunked transformation of a full-table extract.
//!
//! Each batch read from the extract is turned into IndicatorValues,
//! GeographyReferenceForIndicator and GeographicLevelForIndicator rows and
//! flushed before the next batch is read:
//!
//! 1. normalise the reference period and repair the DGUID
//! 2. drop rows outside the run's reference-year policy
//! 3. resolve the indicator by code and the geography by DGUID, recording
//!    anything unresolved in the warning log
//! 4. attach the null reason from the row's status symbol
//! 5. write values, then geography references, then advance the id sequence
//! 6. write geographic-level pairs not stored yet

use std::collections::{HashMap, HashSet};

use polars::prelude::DataFrame;
use tracing::{debug, info, info_span};

use csge_common::{
    f64_column, i64_column, opt_i64_column, parse_f64, str_column, string_values,
    truncate_chars,
};
use csge_ingest::extract_columns as x;
use csge_model::{
    ProductId, Table, TableCounts, UnitConflict, UnresolvedKind, WarningLog, columns as c,
};
use csge_store::{IndicatorKey, RelationalStore};

use crate::combinatorics::UOM_MAX;
use crate::error::{CoreError, Result};
use crate::geography::{ALL_LEVELS, GeographyRules, geographic_level};
use crate::indicator_code::{REF_YEAR_SENTINEL, extract_row_code, fix_ref_year, reference_period};
use crate::merge::{LevelFilter, RunPlan};
use crate::sequence::IdSequence;

pub const INDICATOR_VALUE_CODE_MAX: usize = 100;
pub const GEOGRAPHY_REFERENCE_ID_MAX: usize = 25;

/// Stand-in id for warnings about rows with an empty DGUID.
const EMPTY_DGUID: &str = "<empty>";

/// A stored indicator an extract row can attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRef {
    pub id: i64,
    pub uom_en: String,
}

/// Indicators of the functional product keyed by IndicatorCode.
#[derive(Debug, Clone, Default)]
pub struct IndicatorIndex {
    by_code: HashMap<String, IndicatorRef>,
}

impl IndicatorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys(keys: Vec<IndicatorKey>) -> Self {
        let mut index = Self::new();
        for key in keys {
            index.insert(key.code, key.indicator_id, key.uom_en);
        }
        index
    }

    pub fn insert(&mut self, code: impl Into<String>, id: i64, uom_en: impl Into<String>) {
        self.by_code.insert(
            code.into(),
            IndicatorRef {
                id,
                uom_en: uom_en.into(),
            },
        );
    }

    pub fn get(&self, code: &str) -> Option<&IndicatorRef> {
        self.by_code.get(code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// Read-only reference data joined against every batch.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSets {
    pub geography: HashSet<String>,
    /// Status symbol to NullReasonId.
    pub null_reasons: HashMap<String, i64>,
}

impl ReferenceSets {
    pub fn load(store: &dyn RelationalStore) -> Result<Self> {
        Ok(Self {
            geography: store.geography_reference_ids()?,
            null_reasons: store.null_reason_ids()?,
        })
    }
}

/// One observation that resolved against every reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub indicator_id: i64,
    pub geography_reference_id: String,
    pub value: Option<f64>,
    pub null_reason_id: Option<i64>,
    pub value_code: String,
    pub reference_period: String,
}

/// A transformed batch, not yet written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformedBatch {
    pub observations: Vec<Observation>,
    /// New (IndicatorId, GeographicLevelId) pairs.
    pub levels: Vec<(i64, String)>,
    pub rows_in: usize,
    pub rows_filtered: usize,
}

impl TransformedBatch {
    /// IndicatorValues rows keyed from `first_id`.
    pub fn values_frame(&self, first_id: i64) -> Result<DataFrame> {
        let obs = &self.observations;
        Ok(DataFrame::new(vec![
            i64_column(c::INDICATOR_VALUE_ID, value_ids(first_id, obs.len())),
            f64_column(c::VALUE, obs.iter().map(|o| o.value).collect()),
            opt_i64_column(c::NULL_REASON_ID, obs.iter().map(|o| o.null_reason_id).collect()),
            str_column(
                c::INDICATOR_VALUE_CODE,
                obs.iter().map(|o| o.value_code.clone()).collect(),
            ),
        ])?)
    }

    /// GeographyReferenceForIndicator rows for values keyed from `first_id`.
    pub fn references_frame(&self, first_id: i64) -> Result<DataFrame> {
        let obs = &self.observations;
        Ok(DataFrame::new(vec![
            str_column(
                c::GEOGRAPHY_REFERENCE_ID,
                obs.iter().map(|o| o.geography_reference_id.clone()).collect(),
            ),
            i64_column(c::INDICATOR_ID, obs.iter().map(|o| o.indicator_id).collect()),
            i64_column(c::INDICATOR_VALUE_ID, value_ids(first_id, obs.len())),
            str_column(
                c::REFERENCE_PERIOD,
                obs.iter().map(|o| o.reference_period.clone()).collect(),
            ),
        ])?)
    }

    pub fn levels_frame(&self) -> Result<DataFrame> {
        Ok(DataFrame::new(vec![
            i64_column(c::INDICATOR_ID, self.levels.iter().map(|(id, _)| *id).collect()),
            str_column(
                c::GEOGRAPHIC_LEVEL_ID,
                self.levels.iter().map(|(_, level)| level.clone()).collect(),
            ),
        ])?)
    }
}

fn value_ids(first_id: i64, count: usize) -> Vec<i64> {
    (first_id..first_id + count as i64).collect()
}

/// Totals of a finished pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    pub counts: TableCounts,
    pub warnings: WarningLog,
    pub batches: usize,
    pub rows_read: usize,
}

/// Streams extract batches into the store for one product run.
pub struct ChunkPipeline<'a> {
    plan: &'a RunPlan,
    rules: GeographyRules,
    geography_position: Option<u32>,
    indicators: &'a IndicatorIndex,
    references: &'a ReferenceSets,
    levels: LevelFilter,
    values: IdSequence,
    conflicts: HashSet<String>,
    outcome: PipelineOutcome,
}

impl<'a> ChunkPipeline<'a> {
    pub fn new(
        plan: &'a RunPlan,
        geography_position: Option<u32>,
        indicators: &'a IndicatorIndex,
        references: &'a ReferenceSets,
        levels: LevelFilter,
        values: IdSequence,
    ) -> Self {
        Self {
            plan,
            rules: GeographyRules::for_subject(plan.product_id.subject()),
            geography_position,
            indicators,
            references,
            levels,
            values,
            conflicts: HashSet::new(),
            outcome: PipelineOutcome::default(),
        }
    }

    fn functional_id(&self) -> ProductId {
        self.plan.functional_id()
    }

    /// Resolve one batch against the indicator and reference sets.
    pub fn transform_batch(&mut self, batch: &DataFrame) -> Result<TransformedBatch> {
        let ref_dates = string_values(batch, x::REF_DATE)?;
        let dguids = string_values(batch, x::DGUID)?;
        let coordinates = string_values(batch, x::COORDINATE)?;
        let statuses = string_values(batch, x::STATUS)?;
        let raw_values = string_values(batch, x::VALUE)?;
        let uoms = string_values(batch, x::UOM)?;

        let functional_id = self.functional_id();
        let sibling = self.plan.is_sibling();
        let years = &self.plan.years;
        let mut out = TransformedBatch {
            rows_in: batch.height(),
            ..TransformedBatch::default()
        };

        for row in 0..batch.height() {
            let year = fix_ref_year(&ref_dates[row]).unwrap_or_else(|| {
                self.outcome
                    .warnings
                    .record(UnresolvedKind::ReferencePeriod, ref_dates[row].trim());
                REF_YEAR_SENTINEL
            });
            let dguid = self.rules.repair(&dguids[row], year);
            let level = geographic_level(&dguid).unwrap_or_default().to_string();
            if !years.keeps_observation(year, &level) {
                out.rows_filtered += 1;
                continue;
            }

            let code = extract_row_code(functional_id, &coordinates[row], self.geography_position, year);
            let Some(indicator) = self.indicators.get(&code) else {
                self.outcome.warnings.record(UnresolvedKind::IndicatorCode, code);
                continue;
            };
            // The master already published these coarse rows.
            if sibling
                && years.is_mixed_geography()
                && years.is_coarse(&level)
                && self.levels.existed_before(indicator.id, &level)
            {
                out.rows_filtered += 1;
                continue;
            }
            if dguid.is_empty() || !self.references.geography.contains(&dguid) {
                let id = if dguid.is_empty() { EMPTY_DGUID } else { dguid.as_str() };
                self.outcome.warnings.record(UnresolvedKind::Geography, id);
                continue;
            }

            if sibling {
                let uom = truncate_chars(uoms[row].trim(), UOM_MAX);
                if uom != indicator.uom_en && self.conflicts.insert(code.clone()) {
                    debug!(code = %code, master = %indicator.uom_en, sibling = %uom, "Unit conflict");
                    self.outcome.warnings.record_unit_conflict(UnitConflict {
                        indicator_code: code.clone(),
                        master_uom: indicator.uom_en.clone(),
                        sibling_uom: uom,
                    });
                }
            }

            if self.levels.admit(indicator.id, &level) {
                out.levels.push((indicator.id, level));
            }
            if !sibling && self.levels.admit(indicator.id, ALL_LEVELS) {
                out.levels.push((indicator.id, ALL_LEVELS.to_string()));
            }

            out.observations.push(Observation {
                indicator_id: indicator.id,
                geography_reference_id: truncate_chars(&dguid, GEOGRAPHY_REFERENCE_ID_MAX),
                value: parse_f64(&raw_values[row]),
                null_reason_id: self.references.null_reasons.get(statuses[row].trim()).copied(),
                value_code: truncate_chars(&format!("{dguid}.{code}"), INDICATOR_VALUE_CODE_MAX),
                reference_period: reference_period(year),
            });
        }
        Ok(out)
    }

    /// Write a transformed batch. The value sequence only advances once both
    /// value and reference rows are stored.
    pub fn write_batch(
        &mut self,
        store: &mut dyn RelationalStore,
        index: usize,
        batch: &TransformedBatch,
    ) -> Result<()> {
        let count = batch.observations.len();
        let ids = self.values.reserve(count);

        let values = batch.values_frame(ids.start)?;
        let written = self.insert(store, Table::IndicatorValues, &values, index)?;
        self.outcome.counts.indicator_values += written;

        let references = batch.references_frame(ids.start)?;
        let written = self.insert(store, Table::GeographyReferenceForIndicator, &references, index)?;
        self.outcome.counts.geography_references += written;
        self.values.advance(count);

        let levels = batch.levels_frame()?;
        let written = self.insert(store, Table::GeographicLevelForIndicator, &levels, index)?;
        self.outcome.counts.geographic_levels += written;
        Ok(())
    }

    fn insert(
        &self,
        store: &mut dyn RelationalStore,
        table: Table,
        rows: &DataFrame,
        batch: usize,
    ) -> Result<usize> {
        store
            .insert(table, rows)
            .map(|outcome| outcome.rows())
            .map_err(|source| CoreError::InsertFailed {
                table,
                product_id: self.plan.product_id,
                batch: Some(batch),
                source,
            })
    }

    /// Transform and flush every batch in turn.
    pub fn run<I>(&mut self, store: &mut dyn RelationalStore, batches: I) -> Result<()>
    where
        I: IntoIterator<Item = csge_ingest::Result<DataFrame>>,
    {
        for batch in batches {
            let batch = batch?;
            let index = self.outcome.batches;
            let span = info_span!("batch", index);
            let _guard = span.enter();

            let transformed = self.transform_batch(&batch)?;
            self.write_batch(store, index, &transformed)?;

            self.outcome.batches += 1;
            self.outcome.rows_read += transformed.rows_in;
            info!(
                rows = transformed.rows_in,
                values = transformed.observations.len(),
                filtered = transformed.rows_filtered,
                levels = transformed.levels.len(),
                "Flushed batch"
            );
        }
        Ok(())
    }

    pub fn next_value_id(&self) -> i64 {
        self.values.peek()
    }

    pub fn finish(self) -> PipelineOutcome {
        self.outcome
    }
}
