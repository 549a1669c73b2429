//! New-product insert workflow.
//!
//! Writes the theme, dimension and dimension-value rows a product needs
//! before its first rebuild, and registers its merge group.

use polars::prelude::DataFrame;
use tracing::info;

use csge_common::{i64_column, opt_i64_column, str_column};
use csge_model::{DimensionType, ProductId, Table, columns as c};
use csge_registry::MergeRegistry;
use csge_source::{MetadataProvider, ProductDescriptor, resolve_product};
use csge_store::RelationalStore;

use crate::error::{CoreError, Result};
use crate::rebuild::insert_whole;
use crate::sequence::IdSequence;

/// Name of the synthetic reference-year dimension, in both languages.
pub const DATE_DIMENSION: &str = "Date";

/// One dimension as it is published, members in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedDimension {
    pub name_en: String,
    pub name_fr: String,
    pub kind: DimensionType,
    /// `(name_en, name_fr)` per member.
    pub members: Vec<(String, String)>,
}

/// Classification axes in coordinate order followed by the Date axis.
/// Only the last dimension is Value-typed.
pub fn published_dimensions(descriptor: &ProductDescriptor) -> Vec<PublishedDimension> {
    let mut dimensions: Vec<PublishedDimension> = descriptor
        .dimensions
        .iter()
        .map(|d| PublishedDimension {
            name_en: d.name_en.clone(),
            name_fr: d.name_fr.clone(),
            kind: DimensionType::Filter,
            members: d
                .members
                .iter()
                .map(|m| (m.name_en.clone(), m.name_fr.clone()))
                .collect(),
        })
        .collect();
    dimensions.push(PublishedDimension {
        name_en: DATE_DIMENSION.to_string(),
        name_fr: DATE_DIMENSION.to_string(),
        kind: DimensionType::Filter,
        members: descriptor
            .reference_years
            .iter()
            .map(|y| (y.to_string(), y.to_string()))
            .collect(),
    });
    if let Some(last) = dimensions.last_mut() {
        last.kind = DimensionType::Value;
    }
    dimensions
}

/// `01. Male`
pub fn ordered_label(order: usize, name: &str) -> String {
    format!("{order:02}. {name}")
}

fn theme_frame(descriptor: &ProductDescriptor) -> Result<DataFrame> {
    Ok(DataFrame::new(vec![
        i64_column(c::THEME_ID, vec![descriptor.product_id.as_i64()]),
        str_column(c::THEME_EN, vec![descriptor.title_en.clone()]),
        str_column(c::THEME_FR, vec![descriptor.title_fr.clone()]),
        i64_column(c::PARENT_THEME_ID, vec![i64::from(descriptor.subject().get())]),
        opt_i64_column(c::SURVEY_CODE, vec![descriptor.survey_code]),
    ])?)
}

fn dimension_frames(
    product_id: ProductId,
    dimensions: &[PublishedDimension],
    first_dimension: i64,
    first_value: i64,
) -> Result<(DataFrame, DataFrame)> {
    let mut dim_ids = Vec::with_capacity(dimensions.len());
    let mut value_ids = Vec::new();
    let mut value_dims = Vec::new();
    let mut display_en = Vec::new();
    let mut display_fr = Vec::new();
    let mut orders = Vec::new();

    let mut next_value = first_value;
    for (dimension_id, dimension) in (first_dimension..).zip(dimensions) {
        dim_ids.push(dimension_id);
        for (i, (en, fr)) in dimension.members.iter().enumerate() {
            let order = i + 1;
            value_ids.push(next_value);
            value_dims.push(dimension_id);
            display_en.push(ordered_label(order, en));
            display_fr.push(ordered_label(order, fr));
            orders.push(order as i64);
            next_value += 1;
        }
    }

    let n = dimensions.len();
    let dims = DataFrame::new(vec![
        i64_column(c::DIMENSION_ID, dim_ids),
        i64_column(c::THEME_ID, vec![product_id.as_i64(); n]),
        str_column(c::DIMENSION_EN, dimensions.iter().map(|d| d.name_en.clone()).collect()),
        str_column(c::DIMENSION_FR, dimensions.iter().map(|d| d.name_fr.clone()).collect()),
        i64_column(c::DISPLAY_ORDER, (1..=n as i64).collect()),
        str_column(
            c::DIMENSION_TYPE,
            dimensions.iter().map(|d| d.kind.as_str().to_string()).collect(),
        ),
    ])?;
    let parents = vec![None; value_ids.len()];
    let values = DataFrame::new(vec![
        i64_column(c::DIMENSION_VALUE_ID, value_ids),
        i64_column(c::DIMENSION_ID, value_dims),
        str_column(c::DISPLAY_EN, display_en),
        str_column(c::DISPLAY_FR, display_fr),
        i64_column(c::VALUE_DISPLAY_ORDER, orders),
        opt_i64_column(c::VALUE_DISPLAY_PARENT, parents),
    ])?;
    Ok((dims, values))
}

/// Rows written by [`create_product`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedProduct {
    pub product_id: ProductId,
    pub dimensions: usize,
    pub dimension_values: usize,
    pub siblings: Vec<ProductId>,
}

/// Create a new product; the first id is the master of any further ids.
///
/// The registry is only updated once every row is written. The caller saves
/// it and rebuilds the group.
pub fn create_product(
    store: &mut dyn RelationalStore,
    provider: &dyn MetadataProvider,
    registry: &mut MergeRegistry,
    product_ids: &[ProductId],
) -> Result<CreatedProduct> {
    let Some((&master, siblings)) = product_ids.split_first() else {
        return Err(CoreError::EmptyRequest);
    };
    if store.theme_exists(master)? {
        return Err(CoreError::ProductExists { product_id: master });
    }
    let descriptor = resolve_product(provider, master)?;

    let mut updated = registry.clone();
    if !siblings.is_empty() {
        updated.register_group(master, siblings)?;
    }

    let dimensions = published_dimensions(&descriptor);
    let first_dimension = IdSequence::seed(store, Table::Dimensions)?.peek();
    let first_value = IdSequence::seed(store, Table::DimensionValues)?.peek();
    let (dims, values) = dimension_frames(master, &dimensions, first_dimension, first_value)?;

    insert_whole(store, Table::IndicatorTheme, &theme_frame(&descriptor)?, master)?;
    let dimension_count = insert_whole(store, Table::Dimensions, &dims, master)?;
    let value_count = insert_whole(store, Table::DimensionValues, &values, master)?;

    *registry = updated;
    info!(
        product_id = %master,
        dimensions = dimension_count,
        values = value_count,
        siblings = siblings.len(),
        "Created product"
    );
    Ok(CreatedProduct {
        product_id: master,
        dimensions: dimension_count,
        dimension_values: value_count,
        siblings: registry.siblings_of(master).to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_zero_padded() {
        assert_eq!(ordered_label(1, "Male"), "01. Male");
        assert_eq!(ordered_label(12, "2019"), "12. 2019");
    }
}
