//! Merge roles and reference-year policy for a product run.

use std::collections::HashSet;

use csge_model::{MergeRole, ProductId};
use csge_registry::{MergeRegistry, MixedGeographyConfig};

/// Which reference years are kept, and at which geographic levels.
///
/// Only mixed-geography products are restricted: with a minimum year, their
/// older years are kept at the coarse levels only. Every other product keeps
/// all of its years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearPolicy {
    min_ref_year: Option<i32>,
    mixed_geography: bool,
    coarse_levels: Vec<String>,
}

impl YearPolicy {
    pub fn unrestricted() -> Self {
        Self {
            min_ref_year: None,
            mixed_geography: false,
            coarse_levels: Vec::new(),
        }
    }

    /// Policy for a product; `min_ref_year` overrides the configured value.
    pub fn for_product(
        config: &MixedGeographyConfig,
        product_id: ProductId,
        min_ref_year: Option<i32>,
    ) -> Self {
        Self {
            min_ref_year: min_ref_year.or(config.min_ref_year),
            mixed_geography: config.applies_to(product_id),
            coarse_levels: config.coarse_levels.clone(),
        }
    }

    pub fn min_ref_year(&self) -> Option<i32> {
        self.min_ref_year
    }

    pub fn is_mixed_geography(&self) -> bool {
        self.mixed_geography
    }

    pub fn is_coarse(&self, level: &str) -> bool {
        self.coarse_levels.iter().any(|l| l == level)
    }

    fn is_recent(&self, year: i32) -> bool {
        self.min_ref_year.is_none_or(|min| year >= min)
    }

    /// Whether indicators for `year` are generated at all: true whenever some
    /// observation of that year can still be kept.
    pub fn keeps_indicator_year(&self, year: i32) -> bool {
        !self.mixed_geography || self.is_recent(year) || !self.coarse_levels.is_empty()
    }

    /// Whether an observation for `year` at `level` is kept.
    pub fn keeps_observation(&self, year: i32, level: &str) -> bool {
        !self.mixed_geography || self.is_recent(year) || self.is_coarse(level)
    }
}

/// Everything decided about a product before its rows are touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub product_id: ProductId,
    pub role: MergeRole,
    pub years: YearPolicy,
}

impl RunPlan {
    pub fn new(product_id: ProductId, role: MergeRole, years: YearPolicy) -> Self {
        Self {
            product_id,
            role,
            years,
        }
    }

    pub fn resolve(
        registry: &MergeRegistry,
        config: &MixedGeographyConfig,
        product_id: ProductId,
        min_ref_year: Option<i32>,
    ) -> Self {
        Self::new(
            product_id,
            registry.role(product_id),
            YearPolicy::for_product(config, product_id, min_ref_year),
        )
    }

    /// Product id the rows are published under.
    pub fn functional_id(&self) -> ProductId {
        self.role.functional_product_id(self.product_id)
    }

    pub fn is_sibling(&self) -> bool {
        self.role.is_sibling()
    }
}

/// Filter deciding which geographic-level rows a run still has to write.
#[derive(Debug, Clone, Default)]
pub struct LevelFilter {
    /// Pairs stored before the run began (the master's, for a sibling).
    existing: HashSet<(i64, String)>,
    /// Pairs stored or queued so far, including this run's.
    known: HashSet<(i64, String)>,
}

impl LevelFilter {
    pub fn new(existing: HashSet<(i64, String)>) -> Self {
        Self {
            known: existing.clone(),
            existing,
        }
    }

    /// True when the pair was stored before this run started.
    pub fn existed_before(&self, indicator_id: i64, level: &str) -> bool {
        self.existing.contains(&(indicator_id, level.to_string()))
    }

    /// Record the pair; true when it was not known yet.
    pub fn admit(&mut self, indicator_id: i64, level: &str) -> bool {
        self.known.insert((indicator_id, level.to_string()))
    }
}
