//! Product rebuild coordination.
//!
//! A rebuild always covers a whole merge group. The group's derived rows are
//! deleted once, under the master's product id, then the master is loaded
//! and each sibling appends to it. Nothing is deleted until every product's
//! metadata has resolved.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use polars::prelude::DataFrame;
use tracing::{info, info_span, warn};

use csge_common::string_values;
use csge_ingest::{ExtractOptions, ExtractReader, extract_columns};
use csge_model::{ProductId, ProductReport, Table, WarningLog};
use csge_registry::{MergeRegistry, MixedGeographyConfig, ProductDefaultsFile};
use csge_source::{
    ExtractSource, Lang, MetadataProvider, ProductDescriptor, resolve_product,
};
use csge_store::{CuratedMetadata, RelationalStore};

use crate::combinatorics::{generate_candidates, select_candidates};
use crate::error::{CoreError, Result};
use crate::indicator_code::fix_ref_year;
use crate::indicators::{PublishedIndicator, assign_ids, index_of, indicator_frame};
use crate::merge::{LevelFilter, RunPlan};
use crate::metadata::{DimensionKeyIndex, metadata_frame, related_charts_frame};
use crate::sequence::IdSequence;
use crate::transform::{ChunkPipeline, IndicatorIndex, ReferenceSets};

/// Run-wide settings shared by every product.
#[derive(Debug, Clone, Default)]
pub struct RebuildOptions {
    pub extract: ExtractOptions,
    pub mixed_geography: MixedGeographyConfig,
    /// Overrides the configured minimum reference year.
    pub min_ref_year: Option<i32>,
}

/// Result of one product within a group rebuild.
#[derive(Debug)]
pub struct ProductOutcome {
    pub product_id: ProductId,
    pub result: Result<ProductReport>,
}

impl ProductOutcome {
    pub fn new(product_id: ProductId, result: Result<ProductReport>) -> Self {
        Self { product_id, result }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Delete a product's derived rows in dependency order.
pub fn delete_product_rows(
    store: &mut dyn RelationalStore,
    product_id: ProductId,
) -> Result<Vec<(Table, usize)>> {
    let mut deleted = Vec::with_capacity(Table::DELETE_ORDER.len());
    for table in Table::DELETE_ORDER {
        let rows = store
            .delete_product(table, product_id)
            .map_err(|source| CoreError::DeleteFailed {
                table,
                product_id,
                source,
            })?;
        info!(%table, rows, "Deleted rows");
        deleted.push((table, rows));
    }
    Ok(deleted)
}

/// Reference years the extract's observations are keyed by.
///
/// Split-year periods such as `2017/2018` count under their later year, so
/// these can be offset from the cube's start and end dates. Periods that do
/// not normalise are left out.
pub fn extract_reference_years(path: &Path, options: &ExtractOptions) -> Result<BTreeSet<i32>> {
    let options = options
        .clone()
        .with_columns([extract_columns::REF_DATE]);
    let mut years = BTreeSet::new();
    for batch in ExtractReader::open(path, options)? {
        for raw in string_values(&batch?, extract_columns::REF_DATE)? {
            if let Some(year) = fix_ref_year(&raw) {
                years.insert(year);
            }
        }
    }
    Ok(years)
}

pub(crate) fn insert_whole(
    store: &mut dyn RelationalStore,
    table: Table,
    rows: &DataFrame,
    product_id: ProductId,
) -> Result<usize> {
    store
        .insert(table, rows)
        .map(|outcome| outcome.rows())
        .map_err(|source| CoreError::InsertFailed {
            table,
            product_id,
            batch: None,
            source,
        })
}

/// Rebuilds products against one metadata provider, extract source and store.
pub struct Rebuilder<'a> {
    provider: &'a dyn MetadataProvider,
    extracts: &'a dyn ExtractSource,
    registry: &'a MergeRegistry,
    defaults: &'a ProductDefaultsFile,
    options: RebuildOptions,
}

impl<'a> Rebuilder<'a> {
    pub fn new(
        provider: &'a dyn MetadataProvider,
        extracts: &'a dyn ExtractSource,
        registry: &'a MergeRegistry,
        defaults: &'a ProductDefaultsFile,
        options: RebuildOptions,
    ) -> Self {
        Self {
            provider,
            extracts,
            registry,
            defaults,
            options,
        }
    }

    pub fn plan(&self, product_id: ProductId) -> RunPlan {
        RunPlan::resolve(
            self.registry,
            &self.options.mixed_geography,
            product_id,
            self.options.min_ref_year,
        )
    }

    /// Rebuild the merge group containing `product_id`, master first.
    ///
    /// Returns one outcome per group member. A failure before deletion, or
    /// of the master itself, fails every member; a sibling failure only
    /// fails that sibling.
    pub fn rebuild_group(
        &self,
        store: &mut dyn RelationalStore,
        product_id: ProductId,
    ) -> Vec<ProductOutcome> {
        let group = self.registry.group_of(product_id);
        let Some((&master, siblings)) = group.split_first() else {
            return Vec::new();
        };
        if master != product_id {
            info!(%product_id, %master, "Sibling requested; rebuilding its merge group");
        }

        let prepared = match self.prepare(store, master) {
            Ok(prepared) => prepared,
            Err(err) => return fail_group(master, siblings, err),
        };
        let sibling_descriptors: Vec<Result<ProductDescriptor>> = siblings
            .iter()
            .map(|&sibling| Ok(resolve_product(self.provider, sibling)?))
            .collect();

        if let Err(err) = delete_product_rows(store, master) {
            return fail_group(master, siblings, err);
        }

        let (descriptor, curated) = prepared;
        let master_result = self.run_product(store, &self.plan(master), &descriptor, &curated);
        let master_ok = master_result.is_ok();
        let mut outcomes = vec![ProductOutcome::new(master, master_result)];

        for (&sibling, descriptor) in siblings.iter().zip(sibling_descriptors) {
            let result = if master_ok {
                descriptor.and_then(|descriptor| {
                    self.run_product(store, &self.plan(sibling), &descriptor, &HashMap::new())
                })
            } else {
                Err(CoreError::MasterFailed { master })
            };
            outcomes.push(ProductOutcome::new(sibling, result));
        }
        outcomes
    }

    /// Everything the master needs before its rows are deleted.
    fn prepare(
        &self,
        store: &dyn RelationalStore,
        master: ProductId,
    ) -> Result<(ProductDescriptor, HashMap<String, CuratedMetadata>)> {
        if !store.theme_exists(master)? {
            return Err(CoreError::ProductNotLoaded { product_id: master });
        }
        let descriptor = resolve_product(self.provider, master)?;
        let curated = store.curated_metadata(master)?;
        Ok((descriptor, curated))
    }

    /// Load one product into a store whose group rows are already deleted.
    pub fn run_product(
        &self,
        store: &mut dyn RelationalStore,
        plan: &RunPlan,
        descriptor: &ProductDescriptor,
        curated: &HashMap<String, CuratedMetadata>,
    ) -> Result<ProductReport> {
        let span = info_span!("product", product_id = %plan.product_id, role = plan.role.label());
        let _guard = span.enter();

        let functional = plan.functional_id();
        let mut report = ProductReport::new(plan.product_id, plan.role.clone());
        let mut warnings = WarningLog::new();

        let path = self.extracts.full_table_download(plan.product_id, Lang::En)?;
        let (published, index) = if plan.role.owns_indicators() {
            let years = extract_reference_years(&path, &self.options.extract)?;
            let published = self.publish_indicators(store, plan, descriptor, years)?;
            report.counts.indicators = published.len();
            let index = index_of(&published);
            (published, index)
        } else {
            let index = IndicatorIndex::from_keys(store.product_indicators(functional)?);
            if index.is_empty() {
                return Err(CoreError::MasterNotLoaded {
                    product_id: plan.product_id,
                    master: functional,
                });
            }
            (Vec::new(), index)
        };
        info!(indicators = index.len(), "Indicator set ready");

        let references = ReferenceSets::load(store)?;
        let levels = LevelFilter::new(store.geographic_levels(functional)?);
        let values = IdSequence::seed(store, Table::IndicatorValues)?;

        let options = self
            .options
            .extract
            .clone()
            .with_columns(extract_columns::REQUIRED);
        let reader = ExtractReader::open(&path, options)?;

        let mut pipeline = ChunkPipeline::new(
            plan,
            descriptor.geography_position,
            &index,
            &references,
            levels,
            values,
        );
        pipeline.run(store, reader)?;
        let outcome = pipeline.finish();
        report.counts.indicator_values = outcome.counts.indicator_values;
        report.counts.geography_references = outcome.counts.geography_references;
        report.counts.geographic_levels = outcome.counts.geographic_levels;
        report.batches = outcome.batches;
        report.rows_read = outcome.rows_read;
        warnings.merge(outcome.warnings);

        if plan.role.owns_indicators() {
            let defaults = self.defaults.for_product(functional);
            let keys = DimensionKeyIndex::from_records(&store.dimension_values(functional)?);
            let metadata = metadata_frame(&published, defaults, curated, &keys, &mut warnings)?;
            report.counts.metadata =
                insert_whole(store, Table::IndicatorMetaData, &metadata, plan.product_id)?;
            let charts = related_charts_frame(&published, defaults)?;
            report.counts.related_charts =
                insert_whole(store, Table::RelatedCharts, &charts, plan.product_id)?;
        }

        for (kind, id, occurrences) in warnings.entries() {
            warn!(%kind, id, occurrences, "Unresolved reference");
        }
        for conflict in warnings.unit_conflicts() {
            warn!(
                code = %conflict.indicator_code,
                master = %conflict.master_uom,
                sibling = %conflict.sibling_uom,
                "Sibling unit differs from master"
            );
        }
        report.warnings = warnings;
        info!(
            indicators = report.counts.indicators,
            values = report.counts.indicator_values,
            levels = report.counts.geographic_levels,
            batches = report.batches,
            "Product loaded"
        );
        Ok(report)
    }

    fn publish_indicators(
        &self,
        store: &mut dyn RelationalStore,
        plan: &RunPlan,
        descriptor: &ProductDescriptor,
        extract_years: BTreeSet<i32>,
    ) -> Result<Vec<PublishedIndicator>> {
        let years: Vec<i32> = extract_years.into_iter().collect();
        let generated = if years.is_empty() || years == descriptor.reference_years {
            generate_candidates(descriptor)?
        } else {
            info!(
                metadata = ?descriptor.reference_years,
                extract = ?years,
                "Reference years taken from the extract"
            );
            generate_candidates(&ProductDescriptor {
                reference_years: years,
                ..descriptor.clone()
            })?
        };
        let candidates = select_candidates(generated, |year| plan.years.keeps_indicator_year(year));
        let mut sequence = IdSequence::seed(store, Table::Indicator)?;
        let published = assign_ids(candidates, &sequence);
        let frame = indicator_frame(plan.functional_id(), descriptor.release_date, &published)?;
        insert_whole(store, Table::Indicator, &frame, plan.product_id)?;
        sequence.advance(published.len());
        Ok(published)
    }
}

fn fail_group(master: ProductId, siblings: &[ProductId], err: CoreError) -> Vec<ProductOutcome> {
    std::iter::once(ProductOutcome::new(master, Err(err)))
        .chain(
            siblings
                .iter()
                .map(|&sibling| ProductOutcome::new(sibling, Err(CoreError::MasterFailed { master }))),
        )
        .collect()
}
