//! End-to-end tests for product creation and group rebuilds.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use polars::prelude::DataFrame;
use serde_json::json;
use tempfile::TempDir;

use csge_common::{i64_column, i64_values, str_column, string_values};
use csge_core::{
    ChunkPipeline, CoreError, ErrorKind, IdSequence, IndicatorIndex, LevelFilter, RebuildOptions,
    Rebuilder, ReferenceSets, RunPlan, YearPolicy, changed_products, create_product,
    extract_reference_years,
};
use csge_ingest::{ExtractOptions, extract_columns as x};
use csge_model::{MergeRole, ProductId, Table, UnresolvedKind, columns as c};
use csge_registry::{MergeRegistry, ProductDefaults, ProductDefaultsFile};
use csge_source::{CodeSets, CubeMetadata, ExtractDirectory, InMemoryProvider};
use csge_store::{InsertOutcome, MemoryStore, RelationalStore, StoreError};

const MASTER: &str = "46100053";
const SIBLING: &str = "46100054";

fn pid(raw: &str) -> ProductId {
    raw.parse().unwrap()
}

fn code_sets() -> CodeSets {
    serde_json::from_value(json!({
        "uom": [{"memberUomCode": 223, "memberUomEn": "Number", "memberUomFr": "Nombre"}],
        "frequency": [{"frequencyCode": 12, "frequencyDescEn": "Annual", "frequencyDescFr": "Annuel"}],
        "subject": [{"subjectCode": "46", "subjectEn": "Housing", "subjectFr": "Logement"}]
    }))
    .unwrap()
}

fn cube(product_id: &str, release_time: Option<&str>) -> CubeMetadata {
    serde_json::from_value(json!({
        "productId": product_id,
        "cubeTitleEn": "Residential properties",
        "cubeTitleFr": "Propriétés résidentielles",
        "cubeStartDate": "2019-01-01",
        "cubeEndDate": "2020-01-01",
        "releaseTime": release_time,
        "frequencyCode": 12,
        "surveyCode": ["5257"],
        "dimension": [
            {
                "dimensionPositionId": 1,
                "dimensionNameEn": "Geography",
                "dimensionNameFr": "Géographie",
                "member": [{"memberId": 1, "memberNameEn": "Canada", "memberNameFr": "Canada"}]
            },
            {
                "dimensionPositionId": 2,
                "dimensionNameEn": "Sex",
                "dimensionNameFr": "Sexe",
                "member": [
                    {"memberId": 1, "memberNameEn": "Male", "memberNameFr": "Hommes"},
                    {"memberId": 2, "memberNameEn": "Female", "memberNameFr": "Femmes"}
                ]
            },
            {
                "dimensionPositionId": 3,
                "dimensionNameEn": "Estimates",
                "dimensionNameFr": "Estimations",
                "member": [
                    {"memberId": 1, "memberNameEn": "Count", "memberNameFr": "Nombre", "memberUomCode": 223}
                ]
            }
        ]
    }))
    .unwrap()
}

fn provider() -> InMemoryProvider {
    InMemoryProvider::new(code_sets())
        .with_cube(pid(MASTER), cube(MASTER, Some("2021-03-01T08:30")))
        .with_cube(pid(SIBLING), cube(SIBLING, Some("2021-03-01T08:30")))
}

fn defaults() -> ProductDefaultsFile {
    ProductDefaultsFile::new(ProductDefaults {
        default_breaks_algorithm_id: 1,
        default_breaks: 5,
        primary_chart_type_id: 1,
        color_to: "#08306B".to_string(),
        color_from: "#F7FBFF".to_string(),
        related_chart_type_id: None,
    })
}

fn reference_store() -> MemoryStore {
    let mut store = MemoryStore::new().unwrap();
    let geo = DataFrame::new(vec![
        str_column(
            c::GEOGRAPHY_REFERENCE_ID,
            vec!["2016A000011124".into(), "2016A000235".into(), "2016A000224".into()],
        ),
        str_column(
            c::GEOGRAPHIC_LEVEL_ID,
            vec!["A0000".into(), "A0002".into(), "A0002".into()],
        ),
        str_column(
            c::DISPLAY_NAME_EN,
            vec!["Canada".into(), "Ontario".into(), "Alberta".into()],
        ),
        str_column(
            c::DISPLAY_NAME_FR,
            vec!["Canada".into(), "Ontario".into(), "Alberta".into()],
        ),
    ])
    .unwrap();
    store.insert(Table::GeographyReference, &geo).unwrap();
    let reasons = DataFrame::new(vec![
        i64_column(c::NULL_REASON_ID, vec![3]),
        str_column(c::SYMBOL, vec!["..".into()]),
        str_column(c::DESCRIPTION_EN, vec!["not available".into()]),
        str_column(c::DESCRIPTION_FR, vec!["indisponible".into()]),
    ])
    .unwrap();
    store.insert(Table::IndicatorNullReason, &reasons).unwrap();
    store
}

fn write_extract(root: &Path, product_id: &str, rows: &[&str]) {
    let dir = root.join(format!("{product_id}-en"));
    fs::create_dir_all(&dir).unwrap();
    let mut contents =
        String::from("REF_DATE,GEO,DGUID,UOM,UOM_ID,VECTOR,COORDINATE,STATUS,SYMBOL,VALUE\n");
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    fs::write(dir.join(format!("{product_id}.csv")), contents).unwrap();
}

fn master_rows() -> Vec<&'static str> {
    vec![
        "2019,Canada,2016A000011124,Number,223,v1,1.1.1,,,10",
        "2020,Canada,2016A000011124,Number,223,v2,1.2.1,,,20",
        "2020,Ontario,2016A000235,Number,223,v3,1.1.1,..,,",
        "2020,Nowhere,2016A000299,Number,223,v4,1.1.1,,,5",
    ]
}

fn options() -> RebuildOptions {
    RebuildOptions {
        extract: ExtractOptions::default().with_chunk_size(2),
        ..RebuildOptions::default()
    }
}

fn codes(store: &dyn RelationalStore) -> HashSet<String> {
    let indicators = store.table(Table::Indicator).unwrap();
    string_values(&indicators, c::INDICATOR_CODE)
        .unwrap()
        .into_iter()
        .collect()
}

/// A memory store whose writes to one table fail.
struct FailingStore {
    inner: MemoryStore,
    fail_insert: Option<Table>,
    fail_delete: Option<Table>,
}

impl FailingStore {
    fn failing_insert(inner: MemoryStore, table: Table) -> Self {
        Self {
            inner,
            fail_insert: Some(table),
            fail_delete: None,
        }
    }

    fn failing_delete(inner: MemoryStore, table: Table) -> Self {
        Self {
            inner,
            fail_insert: None,
            fail_delete: Some(table),
        }
    }
}

impl RelationalStore for FailingStore {
    fn insert(&mut self, table: Table, rows: &DataFrame) -> csge_store::Result<InsertOutcome> {
        if self.fail_insert == Some(table) {
            return Err(StoreError::NothingWritten {
                table,
                rows: rows.height(),
            });
        }
        self.inner.insert(table, rows)
    }

    fn delete_ids(
        &mut self,
        table: Table,
        column: &str,
        ids: &HashSet<i64>,
    ) -> csge_store::Result<usize> {
        if self.fail_delete == Some(table) {
            return Err(StoreError::Io {
                path: format!("{table}.csv").into(),
                source: io::Error::other("device not ready"),
            });
        }
        self.inner.delete_ids(table, column, ids)
    }

    fn table(&self, table: Table) -> csge_store::Result<DataFrame> {
        self.inner.table(table)
    }
}

/// A standalone master created and loaded once from `master_rows`.
fn loaded_store(dir: &Path) -> (MemoryStore, MergeRegistry) {
    write_extract(dir, MASTER, &master_rows());
    let provider = provider();
    let extracts = ExtractDirectory::new(dir);
    let defaults = defaults();
    let mut registry = MergeRegistry::new();
    let mut store = reference_store();
    create_product(&mut store, &provider, &mut registry, &[pid(MASTER)]).unwrap();
    let rebuilder = Rebuilder::new(&provider, &extracts, &registry, &defaults, options());
    assert!(rebuilder.rebuild_group(&mut store, pid(MASTER))[0].is_ok());
    (store, registry)
}

// ============================================================================
// Standalone products
// ============================================================================

#[test]
fn new_product_is_created_then_loaded() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), MASTER, &master_rows());
    let provider = provider();
    let extracts = ExtractDirectory::new(dir.path());
    let defaults = defaults();
    let mut registry = MergeRegistry::new();
    let mut store = reference_store();

    let created = create_product(&mut store, &provider, &mut registry, &[pid(MASTER)]).unwrap();
    assert_eq!(created.dimensions, 3);
    assert_eq!(created.dimension_values, 5);
    let dims = store.table(Table::Dimensions).unwrap();
    assert_eq!(
        string_values(&dims, c::DIMENSION_TYPE).unwrap(),
        vec!["Filter", "Filter", "Value"]
    );
    let values = store.table(Table::DimensionValues).unwrap();
    assert_eq!(string_values(&values, c::DISPLAY_EN).unwrap()[0], "01. Male");

    let rebuilder = Rebuilder::new(&provider, &extracts, &registry, &defaults, options());
    let outcomes = rebuilder.rebuild_group(&mut store, pid(MASTER));
    assert_eq!(outcomes.len(), 1);
    let report = outcomes[0].result.as_ref().unwrap();

    assert_eq!(report.role, MergeRole::Standalone);
    assert_eq!(report.counts.indicators, 4);
    assert_eq!(report.counts.indicator_values, 3);
    assert_eq!(report.counts.geography_references, 3);
    assert_eq!(report.counts.geographic_levels, 6);
    assert_eq!(report.counts.metadata, 4);
    assert_eq!(report.counts.related_charts, 4);
    assert_eq!(report.batches, 2);
    assert_eq!(report.rows_read, 4);
    assert_eq!(
        report.warnings.unresolved(UnresolvedKind::Geography),
        vec!["2016A000299"]
    );
    assert!(report.warnings.unresolved(UnresolvedKind::DimensionKey).is_empty());

    let metadata = store.table(Table::IndicatorMetaData).unwrap();
    assert_eq!(
        string_values(&metadata, c::DIMENSION_UNIQUE_KEY).unwrap()[0],
        "1-3-4"
    );
    let charts = store.table(Table::RelatedCharts).unwrap();
    assert_eq!(
        string_values(&charts, c::RELATED_INDICATOR_IDS).unwrap()[0],
        "1"
    );
}

#[test]
fn creating_an_existing_product_is_rejected() {
    let provider = provider();
    let mut registry = MergeRegistry::new();
    let mut store = reference_store();
    create_product(&mut store, &provider, &mut registry, &[pid(MASTER)]).unwrap();

    let err = create_product(&mut store, &provider, &mut registry, &[pid(MASTER)]).unwrap_err();
    assert!(matches!(err, CoreError::ProductExists { .. }));
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn rebuilding_twice_gives_the_same_rows() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), MASTER, &master_rows());
    let provider = provider();
    let extracts = ExtractDirectory::new(dir.path());
    let defaults = defaults();
    let mut registry = MergeRegistry::new();
    let mut store = reference_store();
    create_product(&mut store, &provider, &mut registry, &[pid(MASTER)]).unwrap();
    let rebuilder = Rebuilder::new(&provider, &extracts, &registry, &defaults, options());

    assert!(rebuilder.rebuild_group(&mut store, pid(MASTER))[0].is_ok());
    let first_codes = codes(&store);
    let first_ids = i64_values(&store.table(Table::Indicator).unwrap(), c::INDICATOR_ID).unwrap();

    assert!(rebuilder.rebuild_group(&mut store, pid(MASTER))[0].is_ok());
    assert_eq!(codes(&store), first_codes);
    assert_eq!(
        i64_values(&store.table(Table::Indicator).unwrap(), c::INDICATOR_ID).unwrap(),
        first_ids
    );
    for (table, rows) in [
        (Table::Indicator, 4),
        (Table::IndicatorValues, 3),
        (Table::GeographyReferenceForIndicator, 3),
        (Table::GeographicLevelForIndicator, 6),
        (Table::IndicatorMetaData, 4),
        (Table::RelatedCharts, 4),
    ] {
        assert_eq!(store.row_count(table).unwrap(), rows, "{table}");
    }
}

#[test]
fn curated_presentation_survives_a_rebuild() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), MASTER, &master_rows());
    let provider = provider();
    let extracts = ExtractDirectory::new(dir.path());
    let defaults = defaults();
    let mut registry = MergeRegistry::new();
    let mut store = reference_store();
    create_product(&mut store, &provider, &mut registry, &[pid(MASTER)]).unwrap();
    let rebuilder = Rebuilder::new(&provider, &extracts, &registry, &defaults, options());
    assert!(rebuilder.rebuild_group(&mut store, pid(MASTER))[0].is_ok());

    let mut metadata = store.table(Table::IndicatorMetaData).unwrap();
    let ids: HashSet<i64> = i64_values(&metadata, c::METADATA_ID).unwrap().into_iter().collect();
    metadata
        .with_column(str_column(c::COLOR_TO, vec!["#123456".into(); ids.len()]))
        .unwrap();
    store.delete_ids(Table::IndicatorMetaData, c::METADATA_ID, &ids).unwrap();
    store.insert(Table::IndicatorMetaData, &metadata).unwrap();

    assert!(rebuilder.rebuild_group(&mut store, pid(MASTER))[0].is_ok());
    let rebuilt = store.table(Table::IndicatorMetaData).unwrap();
    assert!(
        string_values(&rebuilt, c::COLOR_TO)
            .unwrap()
            .iter()
            .all(|color| color == "#123456")
    );
    assert!(
        string_values(&rebuilt, c::COLOR_FROM)
            .unwrap()
            .iter()
            .all(|color| color == "#F7FBFF")
    );
}

#[test]
fn malformed_metadata_fails_before_rows_are_touched() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), MASTER, &master_rows());
    let extracts = ExtractDirectory::new(dir.path());
    let defaults = defaults();
    let mut registry = MergeRegistry::new();
    let mut store = reference_store();
    let good = provider();
    create_product(&mut store, &good, &mut registry, &[pid(MASTER)]).unwrap();
    let rebuilder = Rebuilder::new(&good, &extracts, &registry, &defaults, options());
    assert!(rebuilder.rebuild_group(&mut store, pid(MASTER))[0].is_ok());

    let broken = InMemoryProvider::new(code_sets()).with_cube(pid(MASTER), cube(MASTER, None));
    let rebuilder = Rebuilder::new(&broken, &extracts, &registry, &defaults, options());
    let outcomes = rebuilder.rebuild_group(&mut store, pid(MASTER));
    let err = outcomes[0].result.as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedMetadata);
    assert_eq!(store.row_count(Table::Indicator).unwrap(), 4);
    assert_eq!(store.row_count(Table::IndicatorValues).unwrap(), 3);
}

#[test]
fn split_year_periods_key_indicators_by_their_later_year() {
    let dir = TempDir::new().unwrap();
    write_extract(
        dir.path(),
        MASTER,
        &[
            "2017/2018,Canada,2016A000011124,Number,223,v1,1.1.1,,,10",
            "2018/2019,Canada,2016A000011124,Number,223,v1,1.1.1,,,11",
        ],
    );
    let mut fiscal = cube(MASTER, Some("2021-03-01T08:30"));
    fiscal.cube_start_date = Some("2017-01-01".to_string());
    fiscal.cube_end_date = Some("2018-01-01".to_string());
    let provider = InMemoryProvider::new(code_sets()).with_cube(pid(MASTER), fiscal);
    let extracts = ExtractDirectory::new(dir.path());
    let defaults = defaults();
    let mut registry = MergeRegistry::new();
    let mut store = reference_store();
    create_product(&mut store, &provider, &mut registry, &[pid(MASTER)]).unwrap();

    let rebuilder = Rebuilder::new(&provider, &extracts, &registry, &defaults, options());
    let outcomes = rebuilder.rebuild_group(&mut store, pid(MASTER));
    let report = outcomes[0].result.as_ref().unwrap();

    assert_eq!(report.counts.indicators, 4);
    assert_eq!(report.counts.indicator_values, 2);
    assert!(report.warnings.is_empty());
    let codes = codes(&store);
    assert!(codes.contains("46100053.1.1.2018-01-01"));
    assert!(codes.contains("46100053.1.1.2019-01-01"));
    assert!(!codes.contains("46100053.1.1.2017-01-01"));
}

#[test]
fn extract_years_skip_unreadable_periods() {
    let dir = TempDir::new().unwrap();
    write_extract(
        dir.path(),
        MASTER,
        &[
            "2017/18,Canada,2016A000011124,Number,223,v1,1.1.1,,,10",
            "2020-01-01,Canada,2016A000011124,Number,223,v1,1.1.1,,,11",
            "Q3 2020,Canada,2016A000011124,Number,223,v1,1.1.1,,,12",
        ],
    );
    let path = dir.path().join(format!("{MASTER}-en")).join(format!("{MASTER}.csv"));
    let years = extract_reference_years(&path, &ExtractOptions::default()).unwrap();
    assert_eq!(years.into_iter().collect::<Vec<_>>(), vec![2018, 2020]);
}

#[test]
fn unknown_product_is_not_rebuilt() {
    let dir = TempDir::new().unwrap();
    let provider = provider();
    let extracts = ExtractDirectory::new(dir.path());
    let defaults = defaults();
    let registry = MergeRegistry::new();
    let mut store = reference_store();
    let rebuilder = Rebuilder::new(&provider, &extracts, &registry, &defaults, options());

    let outcomes = rebuilder.rebuild_group(&mut store, pid(MASTER));
    assert!(matches!(
        outcomes[0].result,
        Err(CoreError::ProductNotLoaded { .. })
    ));
}

// ============================================================================
// Merge groups
// ============================================================================

#[test]
fn sibling_request_rebuilds_the_whole_group() {
    let dir = TempDir::new().unwrap();
    write_extract(dir.path(), MASTER, &master_rows());
    write_extract(
        dir.path(),
        SIBLING,
        &[
            "2020,Alberta,2016A000224,Number,223,v9,1.1.1,,,7",
            "2020,Alberta,2016A000224,Number,223,v9,1.9.1,,,8",
        ],
    );
    let provider = provider();
    let extracts = ExtractDirectory::new(dir.path());
    let defaults = defaults();
    let mut registry = MergeRegistry::new();
    let mut store = reference_store();
    let created =
        create_product(&mut store, &provider, &mut registry, &[pid(MASTER), pid(SIBLING)])
            .unwrap();
    assert_eq!(created.siblings, vec![pid(SIBLING)]);
    assert!(registry.is_sibling(pid(SIBLING)));
    assert!(!store.theme_exists(pid(SIBLING)).unwrap());

    let rebuilder = Rebuilder::new(&provider, &extracts, &registry, &defaults, options());
    let outcomes = rebuilder.rebuild_group(&mut store, pid(SIBLING));
    let ids: Vec<ProductId> = outcomes.iter().map(|o| o.product_id).collect();
    assert_eq!(ids, vec![pid(MASTER), pid(SIBLING)]);

    let sibling = outcomes[1].result.as_ref().unwrap();
    assert!(sibling.role.is_sibling());
    assert_eq!(sibling.functional_product_id, pid(MASTER));
    assert_eq!(sibling.counts.indicators, 0);
    assert_eq!(sibling.counts.metadata, 0);
    assert_eq!(sibling.counts.indicator_values, 1);
    assert_eq!(sibling.counts.geographic_levels, 0);
    assert_eq!(
        sibling.warnings.unresolved(UnresolvedKind::IndicatorCode),
        vec!["46100053.9.1.2020-01-01"]
    );

    assert_eq!(store.row_count(Table::Indicator).unwrap(), 4);
    assert_eq!(store.row_count(Table::IndicatorValues).unwrap(), 4);
    assert!(codes(&store).iter().all(|code| code.starts_with(MASTER)));

    let again = rebuilder.rebuild_group(&mut store, pid(MASTER));
    assert!(again.iter().all(|o| o.is_ok()));
    assert_eq!(store.row_count(Table::IndicatorValues).unwrap(), 4);
}

#[test]
fn sibling_fails_when_its_master_fails() {
    let dir = TempDir::new().unwrap();
    let provider = provider();
    let extracts = ExtractDirectory::new(dir.path());
    let defaults = defaults();
    let mut registry = MergeRegistry::new();
    let mut store = reference_store();
    create_product(&mut store, &provider, &mut registry, &[pid(MASTER), pid(SIBLING)]).unwrap();

    let rebuilder = Rebuilder::new(&provider, &extracts, &registry, &defaults, options());
    let outcomes = rebuilder.rebuild_group(&mut store, pid(MASTER));
    assert_eq!(outcomes[0].result.as_ref().unwrap_err().kind(), ErrorKind::Io);
    assert!(matches!(
        outcomes[1].result,
        Err(CoreError::MasterFailed { .. })
    ));
}

// ============================================================================
// Worklist
// ============================================================================

#[test]
fn changed_products_keep_known_groups_once() {
    let day = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let next = day.succ_opt().unwrap();
    let provider = provider()
        .with_changed(day, vec![pid(SIBLING), pid("46100027")])
        .with_changed(next, vec![pid(MASTER)]);
    let mut registry = MergeRegistry::new();
    let mut store = reference_store();
    create_product(&mut store, &provider, &mut registry, &[pid(MASTER), pid(SIBLING)]).unwrap();

    let worklist = changed_products(&provider, &store, &registry, day, next).unwrap();
    assert_eq!(worklist, vec![pid(MASTER)]);
}

// ============================================================================
// Store failures
// ============================================================================

#[test]
fn failed_delete_stops_before_anything_is_rebuilt() {
    let dir = TempDir::new().unwrap();
    let (loaded, registry) = loaded_store(dir.path());
    let first_ids = i64_values(&loaded.table(Table::Indicator).unwrap(), c::INDICATOR_ID).unwrap();
    let mut store = FailingStore::failing_delete(loaded, Table::GeographyReferenceForIndicator);
    let provider = provider();
    let extracts = ExtractDirectory::new(dir.path());
    let defaults = defaults();

    let rebuilder = Rebuilder::new(&provider, &extracts, &registry, &defaults, options());
    let outcomes = rebuilder.rebuild_group(&mut store, pid(MASTER));
    let err = outcomes[0].result.as_ref().unwrap_err();
    assert!(matches!(
        err,
        CoreError::DeleteFailed {
            table: Table::GeographyReferenceForIndicator,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::InsertFailure);

    // Tables ahead of the failure are cleared; nothing is written back.
    assert_eq!(store.row_count(Table::RelatedCharts).unwrap(), 0);
    assert_eq!(store.row_count(Table::IndicatorMetaData).unwrap(), 0);
    assert_eq!(store.row_count(Table::GeographyReferenceForIndicator).unwrap(), 3);
    assert_eq!(
        i64_values(&store.table(Table::Indicator).unwrap(), c::INDICATOR_ID).unwrap(),
        first_ids
    );
}

#[test]
fn failed_insert_aborts_the_product() {
    let dir = TempDir::new().unwrap();
    let (loaded, registry) = loaded_store(dir.path());
    let mut store = FailingStore::failing_insert(loaded, Table::GeographyReferenceForIndicator);
    let provider = provider();
    let extracts = ExtractDirectory::new(dir.path());
    let defaults = defaults();

    let rebuilder = Rebuilder::new(&provider, &extracts, &registry, &defaults, options());
    let outcomes = rebuilder.rebuild_group(&mut store, pid(MASTER));
    let err = outcomes[0].result.as_ref().unwrap_err();
    assert!(matches!(
        err,
        CoreError::InsertFailed {
            table: Table::GeographyReferenceForIndicator,
            batch: Some(0),
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::InsertFailure);
    assert_eq!(store.row_count(Table::Indicator).unwrap(), 4);
    assert_eq!(store.row_count(Table::GeographicLevelForIndicator).unwrap(), 0);
    assert_eq!(store.row_count(Table::IndicatorMetaData).unwrap(), 0);
    assert_eq!(store.row_count(Table::RelatedCharts).unwrap(), 0);
}

#[test]
fn failed_batch_write_does_not_consume_value_ids() {
    let plan = RunPlan::new(pid(MASTER), MergeRole::Standalone, YearPolicy::unrestricted());
    let mut index = IndicatorIndex::new();
    index.insert("46100053.1.1.2020-01-01", 1, "Number");
    let references = ReferenceSets::load(&reference_store()).unwrap();
    let mut store =
        FailingStore::failing_insert(reference_store(), Table::GeographyReferenceForIndicator);
    let mut pipeline = ChunkPipeline::new(
        &plan,
        Some(1),
        &index,
        &references,
        LevelFilter::default(),
        IdSequence::starting_at(Table::IndicatorValues, 40),
    );

    let batch = DataFrame::new(vec![
        str_column(x::REF_DATE, vec!["2020".into()]),
        str_column(x::DGUID, vec!["2016A000011124".into()]),
        str_column(x::UOM, vec!["Number".into()]),
        str_column(x::UOM_ID, vec!["223".into()]),
        str_column(x::COORDINATE, vec!["1.1.1".into()]),
        str_column(x::STATUS, vec![String::new()]),
        str_column(x::VALUE, vec!["3".into()]),
    ])
    .unwrap();
    let err = pipeline.run(&mut store, vec![Ok(batch)]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsertFailure);
    assert_eq!(pipeline.next_value_id(), 40);
    assert_eq!(pipeline.finish().batches, 0);
}
