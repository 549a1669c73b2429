//! Indicator identity generation.
//!
//! The indicator set of a product is the cartesian product of the members
//! of its classification dimensions, crossed with its reference years.
//! Member order follows dimension position; the last axis varies fastest.

use std::collections::HashSet;

use csge_common::truncate_chars;
use csge_model::{Dimension, ProductId, UnitOfMeasure};
use csge_source::ProductDescriptor;

use crate::error::{CoreError, Result};
use crate::indicator_code::{indicator_code, reference_period};

/// Separator between member names in indicator names.
pub const NAME_SEPARATOR: &str = " _ ";

pub const INDICATOR_NAME_MAX: usize = 1000;
pub const INDICATOR_DISPLAY_MAX: usize = 500;
pub const UOM_MAX: usize = 50;

/// One dimension flattened into parallel member lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Axis {
    pub label: String,
    pub member_ids: Vec<u32>,
    pub names_en: Vec<String>,
    pub names_fr: Vec<String>,
    pub uom_codes: Vec<Option<u32>>,
}

impl Axis {
    pub fn from_dimension(dimension: &Dimension) -> Self {
        let members = &dimension.members;
        Self {
            label: dimension.name_en.clone(),
            member_ids: members.iter().map(|m| m.member_id).collect(),
            names_en: members.iter().map(|m| m.name_en.clone()).collect(),
            names_fr: members.iter().map(|m| m.name_fr.clone()).collect(),
            uom_codes: members.iter().map(|m| m.uom_code).collect(),
        }
    }

    /// Member count, provided every list agrees on it.
    fn checked_len(&self) -> std::result::Result<usize, String> {
        let len = self.member_ids.len();
        let lengths = [self.names_en.len(), self.names_fr.len(), self.uom_codes.len()];
        if lengths.iter().any(|l| *l != len) {
            return Err(format!(
                "axis {:?} has {len} member ids but {} English names, {} French names and {} units",
                self.label, lengths[0], lengths[1], lengths[2]
            ));
        }
        if len == 0 {
            return Err(format!("axis {:?} has no members", self.label));
        }
        Ok(len)
    }
}

/// One member from each axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    /// Member ids joined by `.`.
    pub coordinate: String,
    pub members_en: Vec<String>,
    pub members_fr: Vec<String>,
    /// Unit of the innermost unit-carrying member.
    pub uom_code: Option<u32>,
}

/// Index tuples of the cartesian product of `lengths`, last index fastest.
pub fn index_product(lengths: &[usize]) -> Vec<Vec<usize>> {
    if lengths.is_empty() || lengths.contains(&0) {
        return Vec::new();
    }
    let total: usize = lengths.iter().product();
    let mut tuples = Vec::with_capacity(total);
    let mut current = vec![0usize; lengths.len()];
    loop {
        tuples.push(current.clone());
        let mut axis = lengths.len();
        loop {
            if axis == 0 {
                return tuples;
            }
            axis -= 1;
            current[axis] += 1;
            if current[axis] < lengths[axis] {
                break;
            }
            current[axis] = 0;
        }
    }
}

/// Cartesian product of the axes.
///
/// Fails before combining anything if an axis's lists disagree in length.
pub fn combine_axes(product_id: ProductId, axes: &[Axis]) -> Result<Vec<Combination>> {
    let malformed = |reason: String| CoreError::MalformedMetadata { product_id, reason };
    if axes.is_empty() {
        return Err(malformed("no classification axes".to_string()));
    }
    let lengths = axes
        .iter()
        .map(Axis::checked_len)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(malformed)?;

    let combinations = index_product(&lengths)
        .into_iter()
        .map(|tuple| {
            let mut ids = Vec::with_capacity(axes.len());
            let mut members_en = Vec::with_capacity(axes.len());
            let mut members_fr = Vec::with_capacity(axes.len());
            let mut uom_code = None;
            for (axis, index) in axes.iter().zip(&tuple) {
                ids.push(axis.member_ids[*index].to_string());
                members_en.push(axis.names_en[*index].clone());
                members_fr.push(axis.names_fr[*index].clone());
                if let Some(code) = axis.uom_codes[*index] {
                    uom_code = Some(code);
                }
            }
            Combination {
                coordinate: ids.join("."),
                members_en,
                members_fr,
                uom_code,
            }
        })
        .collect();
    Ok(combinations)
}

/// A generated indicator identity.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorCandidate {
    pub code: String,
    pub coordinate: String,
    pub ref_year: i32,
    pub members_en: Vec<String>,
    pub members_fr: Vec<String>,
    pub uom: UnitOfMeasure,
}

impl IndicatorCandidate {
    pub fn reference_period(&self) -> String {
        reference_period(self.ref_year)
    }

    /// Short name: the last two members.
    pub fn name_en(&self) -> String {
        short_name(&self.members_en)
    }

    pub fn name_fr(&self) -> String {
        short_name(&self.members_fr)
    }

    pub fn long_name_en(&self) -> String {
        truncate_chars(&self.members_en.join(NAME_SEPARATOR), INDICATOR_NAME_MAX)
    }

    pub fn long_name_fr(&self) -> String {
        truncate_chars(&self.members_fr.join(NAME_SEPARATOR), INDICATOR_NAME_MAX)
    }

    pub fn display_en(&self) -> String {
        display_list(self.ref_year, &self.members_en)
    }

    pub fn display_fr(&self) -> String {
        display_list(self.ref_year, &self.members_fr)
    }

    /// Member names followed by the year, in dimension order.
    pub fn dimension_path(&self) -> Vec<String> {
        let mut path = self.members_en.clone();
        path.push(self.ref_year.to_string());
        path
    }
}

fn short_name(members: &[String]) -> String {
    let start = members.len().saturating_sub(2);
    truncate_chars(&members[start..].join(NAME_SEPARATOR), INDICATOR_NAME_MAX)
}

/// `<ul><li>{year}<li>{member}...</li></ul>`
pub fn display_list(year: i32, members: &[String]) -> String {
    let mut html = format!("<ul><li>{year}");
    for member in members {
        html.push_str("<li>");
        html.push_str(member);
    }
    html.push_str("</li></ul>");
    truncate_chars(&html, INDICATOR_DISPLAY_MAX)
}

/// Every indicator candidate of a product: combinations crossed with years.
pub fn generate_candidates(descriptor: &ProductDescriptor) -> Result<Vec<IndicatorCandidate>> {
    let product_id = descriptor.product_id;
    let axes: Vec<Axis> = descriptor.dimensions.iter().map(Axis::from_dimension).collect();
    let combinations = combine_axes(product_id, &axes)?;
    if descriptor.reference_years.is_empty() {
        return Err(CoreError::MalformedMetadata {
            product_id,
            reason: "no reference years".to_string(),
        });
    }

    let mut candidates =
        Vec::with_capacity(combinations.len() * descriptor.reference_years.len());
    for combination in &combinations {
        let unit = descriptor.unit(combination.uom_code);
        let uom = UnitOfMeasure {
            code: unit.code,
            en: truncate_chars(&unit.en, UOM_MAX),
            fr: truncate_chars(&unit.fr, UOM_MAX),
        };
        for year in &descriptor.reference_years {
            candidates.push(IndicatorCandidate {
                code: indicator_code(product_id, &combination.coordinate, *year),
                coordinate: combination.coordinate.clone(),
                ref_year: *year,
                members_en: combination.members_en.clone(),
                members_fr: combination.members_fr.clone(),
                uom: uom.clone(),
            });
        }
    }
    Ok(candidates)
}

/// Keep candidates whose year passes `keep_year`, first occurrence per code.
pub fn select_candidates(
    candidates: Vec<IndicatorCandidate>,
    keep_year: impl Fn(i32) -> bool,
) -> Vec<IndicatorCandidate> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| keep_year(c.ref_year))
        .filter(|c| seen.insert(c.code.clone()))
        .collect()
}
