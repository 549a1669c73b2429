use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info, info_span};

use csge_core::{ProductOutcome, RebuildOptions, Rebuilder, changed_products, create_product};
use csge_ingest::ExtractOptions;
use csge_model::ProductId;
use csge_registry::{AppConfig, MergeRegistry, ProductDefaultsFile, load_config};
use csge_source::{ExtractDirectory, ExtractSource, MetadataProvider, WdsClient};
use csge_store::{FrameStore, MemoryStore, RelationalStore};

use crate::cli::Request;
use crate::types::RunResult;

/// Invocation settings that are not part of the request itself.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub config: Option<PathBuf>,
    pub dry_run: bool,
    pub min_ref_year: Option<i32>,
}

/// Collaborators shared by every product of one run.
pub struct RunContext<'a> {
    pub provider: &'a dyn MetadataProvider,
    pub extracts: &'a dyn ExtractSource,
    pub defaults: &'a ProductDefaultsFile,
    pub options: RebuildOptions,
    /// Where a new merge group is saved; `None` keeps it in memory.
    pub registry_path: Option<&'a Path>,
}

pub fn rebuild_options(config: &AppConfig, min_ref_year: Option<i32>) -> RebuildOptions {
    RebuildOptions {
        extract: ExtractOptions {
            chunk_size: config.pipeline.chunk_size,
            delimiter: config.delimiter_byte(),
            ..ExtractOptions::default()
        },
        mixed_geography: config.mixed_geography.clone(),
        min_ref_year,
    }
}

/// Load configuration, open the store and services, and run the request.
pub fn run(request: Request, settings: &RunSettings) -> Result<RunResult> {
    let config = load_config(settings.config.as_deref()).context("load configuration")?;

    let mut frame_store = FrameStore::open(config.paths.store_dir.clone())
        .with_context(|| format!("open store {}", config.paths.store_dir.display()))?;
    let mut snapshot;
    let store: &mut dyn RelationalStore = if settings.dry_run {
        snapshot = MemoryStore::snapshot_of(&frame_store).context("copy store for dry run")?;
        &mut snapshot
    } else {
        &mut frame_store
    };

    let provider = WdsClient::new(config.wds.base_url.clone(), config.wds.timeout())
        .context("create metadata client")?;
    let extracts = ExtractDirectory::new(config.paths.extract_dir.clone());
    let mut registry =
        MergeRegistry::load(&config.paths.merge_registry).context("load merge registry")?;
    let defaults = ProductDefaultsFile::load(&config.paths.product_defaults)
        .context("load product defaults")?;

    let context = RunContext {
        provider: &provider,
        extracts: &extracts,
        defaults: &defaults,
        options: rebuild_options(&config, settings.min_ref_year),
        registry_path: (!settings.dry_run).then_some(config.paths.merge_registry.as_path()),
    };
    let result = execute(request, store, &mut registry, &context, settings.dry_run)?;
    if settings.dry_run {
        info!("Dry run finished, store changes discarded");
    }
    Ok(result)
}

/// Run a request against already opened collaborators.
///
/// Product failures are recorded in the result and do not stop the other
/// products; only a failure to build the worklist or save the registry is
/// returned as an error.
pub fn execute(
    request: Request,
    store: &mut dyn RelationalStore,
    registry: &mut MergeRegistry,
    context: &RunContext<'_>,
    dry_run: bool,
) -> Result<RunResult> {
    let mut result = RunResult::new(request.clone(), dry_run);

    let targets: Vec<ProductId> = match &request {
        Request::Insert(product_ids) => {
            insert_products(store, registry, context, product_ids, &mut result)?
        }
        Request::Product(product_id) => vec![*product_id],
        Request::Range { start, end } => {
            let worklist = changed_products(context.provider, &*store, registry, *start, *end)
                .context("find changed products")?;
            if worklist.is_empty() {
                info!(%start, %end, "No loaded products changed in range");
            }
            worklist
        }
    };

    let rebuilder = Rebuilder::new(
        context.provider,
        context.extracts,
        registry,
        context.defaults,
        context.options.clone(),
    );
    for product_id in targets {
        let outcomes = rebuilder.rebuild_group(store, product_id);
        for outcome in &outcomes {
            if let Err(err) = &outcome.result {
                error!(
                    product_id = %outcome.product_id,
                    kind = ?err.kind(),
                    error = %err,
                    "Product failed"
                );
            }
        }
        result.outcomes.extend(outcomes);
    }
    Ok(result)
}

/// Create the product rows and register the merge group. Returns the master
/// to rebuild, or nothing when creation failed.
fn insert_products(
    store: &mut dyn RelationalStore,
    registry: &mut MergeRegistry,
    context: &RunContext<'_>,
    product_ids: &[ProductId],
    result: &mut RunResult,
) -> Result<Vec<ProductId>> {
    let Some(&master) = product_ids.first() else {
        return Ok(Vec::new());
    };
    let _span = info_span!("insert", product_id = %master).entered();
    match create_product(store, context.provider, registry, product_ids) {
        Ok(created) => {
            if !created.siblings.is_empty() {
                if let Some(path) = context.registry_path {
                    registry.save(path).context("save merge registry")?;
                }
            }
            result.created = Some(created);
            Ok(vec![master])
        }
        Err(err) => {
            error!(product_id = %master, kind = ?err.kind(), error = %err, "Product not created");
            result.outcomes.push(ProductOutcome::new(master, Err(err)));
            Ok(Vec::new())
        }
    }
}
