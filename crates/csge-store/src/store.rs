//! The relational store surface.
//!
//! Backends implement three primitives: bulk insert, delete by key set and a
//! table snapshot. Everything the loader asks of the store beyond that is
//! expressed on top of those, so a backend with native queries can override
//! the provided methods.

use std::collections::{HashMap, HashSet};

use polars::prelude::DataFrame;

use csge_common::{i64_values, opt_i64_values, string_values};
use csge_model::{ProductId, Table, columns as c};

use crate::error::{Result, StoreError};

/// Result of a bulk write.
///
/// Distinguishes "nothing to write" from a write that happened, so a write
/// that silently did nothing cannot pass for success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Written(usize),
    /// The frame was empty; the store was not touched.
    NotAttempted,
}

impl InsertOutcome {
    pub fn rows(self) -> usize {
        match self {
            Self::Written(n) => n,
            Self::NotAttempted => 0,
        }
    }
}

/// Identity of a persisted indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorKey {
    pub indicator_id: i64,
    pub code: String,
    pub uom_en: String,
    pub uom_fr: String,
}

/// Presentation values of an indicator metadata row that may have been
/// edited by hand after the last load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CuratedMetadata {
    pub default_breaks_algorithm_id: Option<i64>,
    pub default_breaks: Option<i64>,
    pub primary_chart_type_id: Option<i64>,
    pub color_to: Option<String>,
    pub color_from: Option<String>,
}

/// A persisted dimension member, with its dimension's ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionValueRecord {
    pub dimension_id: i64,
    pub dimension_order: i64,
    pub dimension_en: String,
    pub value_id: i64,
    pub value_order: i64,
    pub display_en: String,
}

pub trait RelationalStore {
    /// Append rows to a table. Every schema column must be present.
    fn insert(&mut self, table: Table, rows: &DataFrame) -> Result<InsertOutcome>;

    /// Delete rows whose integer `column` is in `ids`; returns rows removed.
    fn delete_ids(&mut self, table: Table, column: &str, ids: &HashSet<i64>) -> Result<usize>;

    /// Snapshot of a whole table in schema column order.
    fn table(&self, table: Table) -> Result<DataFrame>;

    fn row_count(&self, table: Table) -> Result<usize> {
        Ok(self.table(table)?.height())
    }

    /// Highest surrogate key in use, if any row exists.
    fn max_id(&self, table: Table) -> Result<Option<i64>> {
        let column = table.id_column().ok_or(StoreError::NoIdColumn { table })?;
        Ok(i64_values(&self.table(table)?, column)?.into_iter().max())
    }

    fn theme_exists(&self, product_id: ProductId) -> Result<bool> {
        let themes = self.table(Table::IndicatorTheme)?;
        Ok(i64_values(&themes, c::THEME_ID)?.contains(&product_id.as_i64()))
    }

    fn geography_reference_ids(&self) -> Result<HashSet<String>> {
        let geo = self.table(Table::GeographyReference)?;
        Ok(string_values(&geo, c::GEOGRAPHY_REFERENCE_ID)?
            .into_iter()
            .collect())
    }

    /// Null-reason symbol to id.
    fn null_reason_ids(&self) -> Result<HashMap<String, i64>> {
        let reasons = self.table(Table::IndicatorNullReason)?;
        let symbols = string_values(&reasons, c::SYMBOL)?;
        let ids = opt_i64_values(&reasons, c::NULL_REASON_ID)?;
        Ok(symbols
            .into_iter()
            .zip(ids)
            .filter_map(|(symbol, id)| id.map(|id| (symbol, id)))
            .collect())
    }

    fn product_indicators(&self, product_id: ProductId) -> Result<Vec<IndicatorKey>> {
        let indicators = self.table(Table::Indicator)?;
        let themes = opt_i64_values(&indicators, c::THEME_ID)?;
        let ids = opt_i64_values(&indicators, c::INDICATOR_ID)?;
        let codes = string_values(&indicators, c::INDICATOR_CODE)?;
        let uom_en = string_values(&indicators, c::UOM_EN)?;
        let uom_fr = string_values(&indicators, c::UOM_FR)?;
        let theme = Some(product_id.as_i64());
        Ok(themes
            .into_iter()
            .zip(ids)
            .zip(codes.into_iter().zip(uom_en.into_iter().zip(uom_fr)))
            .filter_map(|((t, id), (code, (uom_en, uom_fr)))| {
                (t == theme).then_some(())?;
                Some(IndicatorKey {
                    indicator_id: id?,
                    code,
                    uom_en,
                    uom_fr,
                })
            })
            .collect())
    }

    fn product_indicator_ids(&self, product_id: ProductId) -> Result<HashSet<i64>> {
        Ok(self
            .product_indicators(product_id)?
            .into_iter()
            .map(|k| k.indicator_id)
            .collect())
    }

    /// (IndicatorId, GeographicLevelId) pairs already stored for a product.
    fn geographic_levels(&self, product_id: ProductId) -> Result<HashSet<(i64, String)>> {
        let ids = self.product_indicator_ids(product_id)?;
        let levels = self.table(Table::GeographicLevelForIndicator)?;
        let indicator_ids = opt_i64_values(&levels, c::INDICATOR_ID)?;
        let level_ids = string_values(&levels, c::GEOGRAPHIC_LEVEL_ID)?;
        Ok(indicator_ids
            .into_iter()
            .zip(level_ids)
            .filter_map(|(id, level)| id.filter(|id| ids.contains(id)).map(|id| (id, level)))
            .collect())
    }

    /// Current metadata presentation values keyed by IndicatorCode.
    fn curated_metadata(&self, product_id: ProductId) -> Result<HashMap<String, CuratedMetadata>> {
        let code_by_id: HashMap<i64, String> = self
            .product_indicators(product_id)?
            .into_iter()
            .map(|k| (k.indicator_id, k.code))
            .collect();
        let meta = self.table(Table::IndicatorMetaData)?;
        let indicator_ids = opt_i64_values(&meta, c::INDICATOR_ID)?;
        let algorithms = opt_i64_values(&meta, c::BREAKS_ALGORITHM_ID)?;
        let breaks = opt_i64_values(&meta, c::DEFAULT_BREAKS)?;
        let charts = opt_i64_values(&meta, c::PRIMARY_CHART_TYPE_ID)?;
        let color_to = string_values(&meta, c::COLOR_TO)?;
        let color_from = string_values(&meta, c::COLOR_FROM)?;

        let non_empty = |s: String| (!s.is_empty()).then_some(s);
        let mut curated = HashMap::new();
        for (i, id) in indicator_ids.into_iter().enumerate() {
            let Some(code) = id.and_then(|id| code_by_id.get(&id)) else {
                continue;
            };
            curated.insert(
                code.clone(),
                CuratedMetadata {
                    default_breaks_algorithm_id: algorithms[i],
                    default_breaks: breaks[i],
                    primary_chart_type_id: charts[i],
                    color_to: non_empty(color_to[i].clone()),
                    color_from: non_empty(color_from[i].clone()),
                },
            );
        }
        Ok(curated)
    }

    /// Dimension members of a product ordered by dimension then member.
    fn dimension_values(&self, product_id: ProductId) -> Result<Vec<DimensionValueRecord>> {
        let dims = self.table(Table::Dimensions)?;
        let dim_ids = opt_i64_values(&dims, c::DIMENSION_ID)?;
        let dim_themes = opt_i64_values(&dims, c::THEME_ID)?;
        let dim_orders = opt_i64_values(&dims, c::DISPLAY_ORDER)?;
        let dim_names = string_values(&dims, c::DIMENSION_EN)?;
        let theme = Some(product_id.as_i64());
        let product_dims: HashMap<i64, (i64, String)> = dim_ids
            .into_iter()
            .zip(dim_themes)
            .zip(dim_orders.into_iter().zip(dim_names))
            .filter_map(|((id, t), (order, name))| {
                (t == theme).then_some(())?;
                Some((id?, (order.unwrap_or_default(), name)))
            })
            .collect();

        let values = self.table(Table::DimensionValues)?;
        let value_ids = opt_i64_values(&values, c::DIMENSION_VALUE_ID)?;
        let value_dims = opt_i64_values(&values, c::DIMENSION_ID)?;
        let value_orders = opt_i64_values(&values, c::VALUE_DISPLAY_ORDER)?;
        let displays = string_values(&values, c::DISPLAY_EN)?;

        let mut records: Vec<DimensionValueRecord> = value_ids
            .into_iter()
            .zip(value_dims)
            .zip(value_orders.into_iter().zip(displays))
            .filter_map(|((value_id, dim_id), (order, display_en))| {
                let dim_id = dim_id?;
                let (dimension_order, dimension_en) = product_dims.get(&dim_id)?;
                Some(DimensionValueRecord {
                    dimension_id: dim_id,
                    dimension_order: *dimension_order,
                    dimension_en: dimension_en.clone(),
                    value_id: value_id?,
                    value_order: order.unwrap_or_default(),
                    display_en,
                })
            })
            .collect();
        records.sort_by_key(|r| (r.dimension_order, r.dimension_id, r.value_order, r.value_id));
        Ok(records)
    }

    /// Delete one derived table's rows belonging to a product.
    ///
    /// Rows are scoped through the product's Indicator ids; IndicatorValues
    /// are scoped through the GeographyReferenceForIndicator linkage, so
    /// they must be deleted before that table.
    fn delete_product(&mut self, table: Table, product_id: ProductId) -> Result<usize> {
        let indicator_ids = self.product_indicator_ids(product_id)?;
        match table {
            Table::RelatedCharts
            | Table::IndicatorMetaData
            | Table::GeographyReferenceForIndicator
            | Table::GeographicLevelForIndicator
            | Table::Indicator => self.delete_ids(table, c::INDICATOR_ID, &indicator_ids),
            Table::IndicatorValues => {
                let links = self.table(Table::GeographyReferenceForIndicator)?;
                let linked = opt_i64_values(&links, c::INDICATOR_ID)?;
                let value_ids = opt_i64_values(&links, c::INDICATOR_VALUE_ID)?;
                let scoped: HashSet<i64> = linked
                    .into_iter()
                    .zip(value_ids)
                    .filter_map(|(indicator, value)| {
                        indicator.filter(|id| indicator_ids.contains(id))?;
                        value
                    })
                    .collect();
                self.delete_ids(table, c::INDICATOR_VALUE_ID, &scoped)
            }
            other => Err(StoreError::NotDerived { table: other }),
        }
    }
}
