//! Tests for the chunked transform pipeline.

use std::collections::{HashMap, HashSet};

use polars::prelude::DataFrame;

use csge_common::{str_column, string_values};
use csge_core::merge::{LevelFilter, RunPlan, YearPolicy};
use csge_core::sequence::IdSequence;
use csge_core::transform::{ChunkPipeline, IndicatorIndex, ReferenceSets};
use csge_ingest::extract_columns as x;
use csge_model::{MergeRole, ProductId, Table, UnresolvedKind, columns as c};
use csge_registry::MixedGeographyConfig;
use csge_store::{MemoryStore, RelationalStore};

fn pid(raw: &str) -> ProductId {
    raw.parse().unwrap()
}

/// `[ref_date, dguid, coordinate, uom, status, value]` rows.
fn batch(rows: &[[&str; 6]]) -> DataFrame {
    let col = |i: usize| -> Vec<String> { rows.iter().map(|r| r[i].to_string()).collect() };
    DataFrame::new(vec![
        str_column(x::REF_DATE, col(0)),
        str_column(x::DGUID, col(1)),
        str_column(x::COORDINATE, col(2)),
        str_column(x::UOM, col(3)),
        str_column(x::UOM_ID, vec!["223".to_string(); rows.len()]),
        str_column(x::STATUS, col(4)),
        str_column(x::VALUE, col(5)),
    ])
    .unwrap()
}

fn references() -> ReferenceSets {
    ReferenceSets {
        geography: HashSet::from(
            ["2016A000235", "2016A000224", "2016S0503535"].map(String::from),
        ),
        null_reasons: HashMap::from([("..".to_string(), 3)]),
    }
}

fn standalone_plan() -> RunPlan {
    RunPlan::new(pid("46100027"), MergeRole::Standalone, YearPolicy::unrestricted())
}

// ============================================================================
// Standalone products
// ============================================================================

#[test]
fn resolved_rows_become_observations() {
    let plan = standalone_plan();
    let mut index = IndicatorIndex::new();
    index.insert("46100027.1.2.2020-01-01", 7, "Number");
    let refs = references();
    let mut pipeline = ChunkPipeline::new(
        &plan,
        Some(1),
        &index,
        &refs,
        LevelFilter::default(),
        IdSequence::starting_at(Table::IndicatorValues, 1),
    );

    let out = pipeline
        .transform_batch(&batch(&[
            ["2020", "2016A000235", "1.1.2", "Number", "", "12.5"],
            ["2020", "9999Z99999", "1.1.2", "Number", "", "1"],
            ["2020", "2016A000235", "1.9.9", "Number", "", "1"],
            ["2020-01-01", "2016A000224", "1.1.2", "Number", "..", ""],
        ]))
        .unwrap();

    assert_eq!(out.rows_in, 4);
    assert_eq!(out.observations.len(), 2);
    let first = &out.observations[0];
    assert_eq!(first.indicator_id, 7);
    assert_eq!(first.value, Some(12.5));
    assert_eq!(first.value_code, "2016A000235.46100027.1.2.2020-01-01");
    assert_eq!(first.reference_period, "2020-01-01");
    let second = &out.observations[1];
    assert_eq!(second.value, None);
    assert_eq!(second.null_reason_id, Some(3));
    assert_eq!(
        out.levels,
        vec![(7, "A0002".to_string()), (7, "SSSS".to_string())]
    );

    let warnings = pipeline.finish().warnings;
    assert_eq!(warnings.unresolved(UnresolvedKind::Geography), vec!["9999Z99999"]);
    assert_eq!(
        warnings.unresolved(UnresolvedKind::IndicatorCode),
        vec!["46100027.9.9.2020-01-01"]
    );
}

#[test]
fn unresolved_geography_writes_nothing() {
    let plan = standalone_plan();
    let mut index = IndicatorIndex::new();
    index.insert("46100027.1.2.2020-01-01", 1, "Number");
    let refs = references();
    let mut store = MemoryStore::new().unwrap();
    let mut pipeline = ChunkPipeline::new(
        &plan,
        Some(1),
        &index,
        &refs,
        LevelFilter::default(),
        IdSequence::starting_at(Table::IndicatorValues, 1),
    );

    pipeline
        .run(
            &mut store,
            vec![Ok(batch(&[["2020", "", "1.1.2", "Number", "", "5"]]))],
        )
        .unwrap();

    let outcome = pipeline.finish();
    assert_eq!(outcome.counts.indicator_values, 0);
    assert_eq!(outcome.warnings.entry_count(), 1);
    assert_eq!(outcome.warnings.unresolved(UnresolvedKind::Geography), vec!["<empty>"]);
    assert_eq!(store.row_count(Table::IndicatorValues).unwrap(), 0);
}

#[test]
fn batches_share_one_value_sequence() {
    let plan = standalone_plan();
    let mut index = IndicatorIndex::new();
    index.insert("46100027.1.2.2020-01-01", 1, "Number");
    let refs = references();
    let mut store = MemoryStore::new().unwrap();
    let mut pipeline = ChunkPipeline::new(
        &plan,
        Some(1),
        &index,
        &refs,
        LevelFilter::default(),
        IdSequence::starting_at(Table::IndicatorValues, 1),
    );

    let row = ["2020", "2016A000235", "1.1.2", "Number", "", "5"];
    pipeline
        .run(&mut store, vec![Ok(batch(&[row, row])), Ok(batch(&[row]))])
        .unwrap();

    assert_eq!(pipeline.next_value_id(), 4);
    let outcome = pipeline.finish();
    assert_eq!(outcome.batches, 2);
    assert_eq!(outcome.counts.indicator_values, 3);
    assert_eq!(outcome.counts.geography_references, 3);
    assert_eq!(outcome.counts.geographic_levels, 2);
    assert_eq!(store.max_id(Table::IndicatorValues).unwrap(), Some(3));
}

#[test]
fn unknown_geography_is_reported_by_its_dguid() {
    let plan = standalone_plan();
    let mut index = IndicatorIndex::new();
    index.insert("46100027.1.2.2020-01-01", 1, "Number");
    let refs = references();
    let mut store = MemoryStore::new().unwrap();
    let mut pipeline = ChunkPipeline::new(
        &plan,
        Some(1),
        &index,
        &refs,
        LevelFilter::default(),
        IdSequence::starting_at(Table::IndicatorValues, 1),
    );

    let unknown = ["2020", "2016A000259", "1.1.2", "Number", "", "5"];
    pipeline
        .run(
            &mut store,
            vec![Ok(batch(&[
                unknown,
                ["2020", "2016A000235", "1.1.2", "Number", "", "6"],
                unknown,
            ]))],
        )
        .unwrap();

    let outcome = pipeline.finish();
    assert_eq!(outcome.counts.indicator_values, 1);
    assert_eq!(
        outcome.warnings.unresolved(UnresolvedKind::Geography),
        vec!["2016A000259"]
    );
    assert_eq!(
        outcome.warnings.entries().collect::<Vec<_>>(),
        vec![(UnresolvedKind::Geography, "2016A000259", 2)]
    );
    let values = store.table(Table::IndicatorValues).unwrap();
    assert_eq!(
        string_values(&values, c::INDICATOR_VALUE_CODE).unwrap(),
        vec!["2016A000235.46100027.1.2.2020-01-01"]
    );
}

#[test]
fn old_fine_grained_rows_of_mixed_products_are_filtered_silently() {
    let product = pid("13100778");
    let years = YearPolicy::for_product(
        &MixedGeographyConfig {
            min_ref_year: Some(2016),
            ..MixedGeographyConfig::default()
        },
        product,
        None,
    );
    let plan = RunPlan::new(product, MergeRole::Standalone, years);
    let mut index = IndicatorIndex::new();
    index.insert("13100778.1.2.2010-01-01", 1, "Number");
    let refs = references();
    let mut pipeline = ChunkPipeline::new(
        &plan,
        Some(1),
        &index,
        &refs,
        LevelFilter::default(),
        IdSequence::starting_at(Table::IndicatorValues, 1),
    );

    let out = pipeline
        .transform_batch(&batch(&[
            ["2010", "2016S0503535", "1.1.2", "Number", "", "5"],
            ["2010", "2016A000235", "1.1.2", "Number", "", "6"],
        ]))
        .unwrap();
    assert_eq!(out.rows_filtered, 1);
    assert_eq!(out.observations.len(), 1);
    assert!(pipeline.finish().warnings.is_empty());
}

#[test]
fn minimum_year_leaves_other_products_alone() {
    let product = pid("46100027");
    let years = YearPolicy::for_product(
        &MixedGeographyConfig {
            min_ref_year: Some(2016),
            ..MixedGeographyConfig::default()
        },
        product,
        None,
    );
    let plan = RunPlan::new(product, MergeRole::Standalone, years);
    let mut index = IndicatorIndex::new();
    index.insert("46100027.1.2.2010-01-01", 1, "Number");
    let refs = references();
    let mut pipeline = ChunkPipeline::new(
        &plan,
        Some(1),
        &index,
        &refs,
        LevelFilter::default(),
        IdSequence::starting_at(Table::IndicatorValues, 1),
    );

    let out = pipeline
        .transform_batch(&batch(&[["2010", "2016A000235", "1.1.2", "Number", "", "5"]]))
        .unwrap();
    assert_eq!(out.rows_filtered, 0);
    assert_eq!(out.observations.len(), 1);
}

// ============================================================================
// Siblings
// ============================================================================

#[test]
fn sibling_appends_without_master_rows() {
    let master = pid("46100053");
    let sibling = pid("46100054");
    let config = MixedGeographyConfig {
        product_ids: vec![sibling],
        min_ref_year: Some(2016),
        ..MixedGeographyConfig::default()
    };
    let plan = RunPlan::new(
        sibling,
        MergeRole::Sibling { master },
        YearPolicy::for_product(&config, sibling, None),
    );
    let mut index = IndicatorIndex::new();
    index.insert("46100053.1.2.2010-01-01", 5, "Number");
    index.insert("46100053.1.2.2020-01-01", 6, "Number");
    let refs = references();
    let mut pipeline = ChunkPipeline::new(
        &plan,
        Some(1),
        &index,
        &refs,
        LevelFilter::new(HashSet::from([(5, "A0002".to_string())])),
        IdSequence::starting_at(Table::IndicatorValues, 100),
    );

    let out = pipeline
        .transform_batch(&batch(&[
            ["2010", "2016A000235", "1.1.2", "Number", "", "1"],
            ["2010", "2016S0503535", "1.1.2", "Number", "", "2"],
            ["2020", "2016A000235", "1.1.2", "Percent", "", "3"],
            ["2020", "2016A000224", "1.1.2", "Percent", "", "4"],
        ]))
        .unwrap();

    assert_eq!(out.rows_filtered, 2);
    assert_eq!(out.observations.len(), 2);
    assert!(out.observations.iter().all(|o| o.indicator_id == 6));
    assert_eq!(out.levels, vec![(6, "A0002".to_string())]);

    let warnings = pipeline.finish().warnings;
    let conflicts = warnings.unit_conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].indicator_code, "46100053.1.2.2020-01-01");
    assert_eq!(conflicts[0].master_uom, "Number");
    assert_eq!(conflicts[0].sibling_uom, "Percent");
}
