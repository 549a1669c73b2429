//! Indicator code derivation.
//!
//! An IndicatorCode is `{productId}.{coordinate}.{year}-01-01` where the
//! coordinate has its geography segment removed. Codes are the natural key
//! joining extract rows to indicators, so derivation must be deterministic.

use csge_common::truncate_chars;
use csge_model::ProductId;

pub const INDICATOR_CODE_MAX: usize = 100;

/// Year used when a reference period cannot be normalised.
pub const REF_YEAR_SENTINEL: i32 = 1900;

/// Replaces the varying segment of a generic indicator code.
pub const GENERIC_WILDCARD: &str = "*";

/// Normalise a raw reference period to a four-digit year.
///
/// Accepts `2020`, `2017/18`, `2017/2018` and ISO dates such as
/// `2020-01-01`. Split years resolve to the later year.
///
/// The short form keeps the century of the first year, so `1999/00` gives
/// 1900. That is also [`REF_YEAR_SENTINEL`], the year callers substitute
/// when this returns `None`, and the two cannot be told apart downstream.
pub fn fix_ref_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    let year = match (raw.len(), raw.as_bytes().get(4)) {
        (4, _) => raw.to_string(),
        (7, Some(b'/')) => format!("{}{}", raw.get(..2)?, raw.get(5..)?),
        (9, Some(b'/')) => raw.get(5..)?.to_string(),
        (10, Some(b'-')) => raw.get(..4)?.to_string(),
        _ => return None,
    };
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}

/// First day of the reference year, as stored in ReferencePeriod columns.
pub fn reference_period(year: i32) -> String {
    format!("{year:04}-01-01")
}

/// Remove the geography segment (1-based `position`) from a coordinate.
pub fn strip_geography(coordinate: &str, position: Option<u32>) -> String {
    let Some(position) = position.and_then(|p| usize::try_from(p).ok()) else {
        return coordinate.trim().to_string();
    };
    coordinate
        .trim()
        .split('.')
        .enumerate()
        .filter(|(index, _)| index + 1 != position)
        .map(|(_, segment)| segment)
        .collect::<Vec<_>>()
        .join(".")
}

pub fn indicator_code(product_id: ProductId, coordinate: &str, year: i32) -> String {
    truncate_chars(
        &format!("{product_id}.{coordinate}.{}", reference_period(year)),
        INDICATOR_CODE_MAX,
    )
}

/// Code of the indicator an extract row belongs to.
pub fn extract_row_code(
    product_id: ProductId,
    raw_coordinate: &str,
    geography_position: Option<u32>,
    year: i32,
) -> String {
    indicator_code(
        product_id,
        &strip_geography(raw_coordinate, geography_position),
        year,
    )
}

/// Generic form of a code: the next-to-last segment, which is the last
/// coordinate member, becomes a wildcard.
///
/// Indicators sharing a generic code differ only in that member and are
/// related. Returns `None` for codes without a coordinate.
pub fn generic_code(code: &str) -> Option<String> {
    let mut segments: Vec<&str> = code.split('.').collect();
    if segments.len() < 3 {
        return None;
    }
    let target = segments.len() - 2;
    segments[target] = GENERIC_WILDCARD;
    Some(segments.join("."))
}
