//! Products to rebuild for a date range.

use chrono::{Days, NaiveDate};
use tracing::{debug, info};

use csge_model::ProductId;
use csge_registry::MergeRegistry;
use csge_source::MetadataProvider;
use csge_store::RelationalStore;

use crate::error::Result;

/// Inclusive range of days, in order.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), |day| day.checked_add_days(Days::new(1)))
        .take_while(move |day| *day <= end)
}

/// Products changed between `start` and `end` that this store publishes.
///
/// A changed product is kept when it has a theme row or is a registered
/// sibling. Each merge group appears once, as its master, in order of first
/// change.
pub fn changed_products(
    provider: &dyn MetadataProvider,
    store: &dyn RelationalStore,
    registry: &MergeRegistry,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<ProductId>> {
    let mut worklist: Vec<ProductId> = Vec::new();
    for day in days_between(start, end) {
        let changed = provider.changed_cube_list(day)?;
        debug!(%day, changed = changed.len(), "Changed cubes");
        for product_id in changed {
            if !registry.is_sibling(product_id) && !store.theme_exists(product_id)? {
                continue;
            }
            let master = registry.master_of(product_id).unwrap_or(product_id);
            if !worklist.contains(&master) {
                worklist.push(master);
            }
        }
    }
    info!(%start, %end, products = worklist.len(), "Built worklist");
    Ok(worklist)
}
