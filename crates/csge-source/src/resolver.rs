//! Product descriptor resolution.
//!
//! Turns raw cube metadata and the shared code sets into the validated,
//! typed description of a product that indicator generation works from.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use csge_model::{
    Dimension, DimensionMember, Frequency, ProductId, SubjectCode, UnitOfMeasure,
};

use crate::MetadataProvider;
use crate::error::{Result, SourceError};
use crate::wds::{CodeSets, CubeMetadata};

/// Everything the loader needs to know about one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDescriptor {
    pub product_id: ProductId,
    pub title_en: String,
    pub title_fr: String,
    pub subject_en: String,
    pub survey_code: Option<i64>,
    pub release_date: NaiveDate,
    pub frequency: Frequency,
    /// Reference years covered by the cube, oldest first.
    pub reference_years: Vec<i32>,
    /// Classification dimensions in coordinate order, geography excluded.
    pub dimensions: Vec<Dimension>,
    /// 1-based coordinate position of the geography dimension.
    pub geography_position: Option<u32>,
    /// Unit text for every unit code carried by a member.
    pub units: BTreeMap<u32, UnitOfMeasure>,
}

impl ProductDescriptor {
    pub fn subject(&self) -> SubjectCode {
        self.product_id.subject()
    }

    /// Unit text for a code; unknown or absent codes give empty text.
    pub fn unit(&self, code: Option<u32>) -> UnitOfMeasure {
        code.and_then(|c| self.units.get(&c).cloned())
            .unwrap_or(UnitOfMeasure {
                code,
                ..UnitOfMeasure::default()
            })
    }

    /// Number of coordinate segments in the extract, geography included.
    pub fn coordinate_width(&self) -> usize {
        self.dimensions.len() + usize::from(self.geography_position.is_some())
    }
}

/// Fetch and validate the metadata of one product.
pub fn resolve_product(
    provider: &dyn MetadataProvider,
    product_id: ProductId,
) -> Result<ProductDescriptor> {
    let metadata = provider.cube_metadata(product_id)?;
    let code_sets = provider.code_sets()?;
    describe(product_id, &metadata, &code_sets)
}

/// Build a descriptor from already fetched metadata.
pub fn describe(
    product_id: ProductId,
    metadata: &CubeMetadata,
    code_sets: &CodeSets,
) -> Result<ProductDescriptor> {
    let malformed = |reason: String| SourceError::MalformedMetadata { product_id, reason };

    let mut raw_dimensions = metadata.dimension.clone();
    raw_dimensions.sort_by_key(|d| d.dimension_position_id);

    let mut geography_position = None;
    let mut dimensions = Vec::with_capacity(raw_dimensions.len());
    for raw in raw_dimensions {
        let dimension = Dimension {
            position: raw.dimension_position_id,
            name_en: raw.dimension_name_en,
            name_fr: raw.dimension_name_fr,
            members: raw
                .member
                .into_iter()
                .map(|m| DimensionMember {
                    member_id: m.member_id,
                    name_en: m.member_name_en,
                    name_fr: m.member_name_fr,
                    uom_code: m.member_uom_code,
                })
                .collect(),
        };
        if dimension.is_geography() {
            geography_position = Some(dimension.position);
            continue;
        }
        if dimension.members.is_empty() {
            return Err(malformed(format!(
                "dimension {:?} has no members",
                dimension.name_en
            )));
        }
        dimensions.push(dimension);
    }
    if dimensions.is_empty() {
        return Err(malformed("no classification dimensions".to_string()));
    }

    let release_date = metadata
        .release_time
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| malformed("missing or invalid releaseTime".to_string()))?;

    let frequency_code = metadata
        .frequency_code
        .ok_or_else(|| malformed("missing frequencyCode".to_string()))?;
    let frequency = Frequency::from_code(frequency_code).map_err(|e| malformed(e.to_string()))?;

    let start = metadata
        .cube_start_date
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| malformed("missing or invalid cubeStartDate".to_string()))?;
    let end = metadata
        .cube_end_date
        .as_deref()
        .and_then(parse_date)
        .ok_or_else(|| malformed("missing or invalid cubeEndDate".to_string()))?;
    if end < start {
        return Err(malformed(format!("cube ends ({end}) before it starts ({start})")));
    }
    let reference_years = reference_years(start.year(), end.year(), frequency);

    let mut units = BTreeMap::new();
    for code in dimensions
        .iter()
        .flat_map(|d| d.members.iter())
        .filter_map(|m| m.uom_code)
    {
        if units.contains_key(&code) {
            continue;
        }
        match code_sets.uom(code) {
            Some(uom) => {
                units.insert(
                    code,
                    UnitOfMeasure {
                        code: Some(code),
                        en: uom.member_uom_en.clone(),
                        fr: uom.member_uom_fr.clone(),
                    },
                );
            }
            None => warn!(%product_id, code, "Unit of measure code not found in code sets"),
        }
    }

    let subject = product_id.subject().to_string();
    let subject_en = code_sets
        .subject(&subject)
        .map(|s| s.subject_en.clone())
        .unwrap_or_default();
    let survey_code = metadata.survey_code.first().and_then(|c| c.as_i64());

    debug!(
        %product_id,
        dimensions = dimensions.len(),
        years = reference_years.len(),
        frequency = code_sets
            .frequency(frequency_code)
            .map_or("", |f| f.frequency_desc_en.as_str()),
        "Resolved product metadata"
    );

    Ok(ProductDescriptor {
        product_id,
        title_en: metadata.cube_title_en.clone(),
        title_fr: metadata.cube_title_fr.clone(),
        subject_en,
        survey_code,
        release_date,
        frequency,
        reference_years,
        dimensions,
        geography_position,
        units,
    })
}

/// Years from `start` to `end` inclusive, stepped by the frequency.
pub fn reference_years(start: i32, end: i32, frequency: Frequency) -> Vec<i32> {
    let step = frequency.year_step();
    let mut years = Vec::new();
    let mut year = start;
    while year <= end {
        years.push(year);
        year += step;
    }
    years
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
