//! IndicatorMetaData and RelatedCharts construction.
//!
//! Runs once per owning product, after its extract has been loaded, over
//! the complete published indicator set.

use std::collections::HashMap;

use polars::prelude::DataFrame;
use tracing::warn;

use csge_common::{i64_column, opt_i64_column, opt_str_column, str_column, truncate_chars};
use csge_model::{UnresolvedKind, WarningLog, columns as c};
use csge_registry::ProductDefaults;
use csge_store::{CuratedMetadata, DimensionValueRecord};

use crate::error::Result;
use crate::indicator_code::generic_code;
use crate::indicators::PublishedIndicator;

pub const FIELD_ALIAS_MAX: usize = 600;
pub const DIMENSION_UNIQUE_KEY_MAX: usize = 50;
pub const COLOR_MAX: usize = 35;
pub const QUERY_MAX: usize = 4000;
pub const RELATED_INDICATOR_LIMIT: usize = 10;

const LOCALE_EN: &str = "en-US";
const LOCALE_FR: &str = "fr-CA";

/// Drop the `NN. ` ordering prefix of a stored member label.
pub fn strip_order_prefix(label: &str) -> &str {
    let digits = label.bytes().take_while(u8::is_ascii_digit).count();
    match label[digits..].strip_prefix('.') {
        Some(rest) if digits > 0 => rest.trim_start(),
        _ => label,
    }
}

/// Member-name lookup over a product's persisted dimension values.
#[derive(Debug, Clone, Default)]
pub struct DimensionKeyIndex {
    /// Per dimension, in display order: member name to DimensionValueId.
    dimensions: Vec<HashMap<String, i64>>,
    /// `(dimension, member name)` pairs carried by more than one value.
    ambiguous: Vec<(String, String)>,
}

impl DimensionKeyIndex {
    /// Build from records sorted by dimension then member order.
    ///
    /// When two members of a dimension share a name, the first in member
    /// order keys it and the name is reported as ambiguous.
    pub fn from_records(records: &[DimensionValueRecord]) -> Self {
        let mut dimensions: Vec<HashMap<String, i64>> = Vec::new();
        let mut ambiguous = Vec::new();
        let mut current = None;
        for record in records {
            if current != Some(record.dimension_id) {
                current = Some(record.dimension_id);
                dimensions.push(HashMap::new());
            }
            let Some(members) = dimensions.last_mut() else {
                continue;
            };
            let name = strip_order_prefix(&record.display_en).to_string();
            if let Some(&kept) = members.get(&name) {
                warn!(
                    dimension = %record.dimension_en,
                    member = %name,
                    kept,
                    ignored = record.value_id,
                    "Dimension member name is not unique"
                );
                ambiguous.push((record.dimension_en.clone(), name));
                continue;
            }
            members.insert(name, record.value_id);
        }
        Self {
            dimensions,
            ambiguous,
        }
    }

    pub fn ambiguous_names(&self) -> &[(String, String)] {
        &self.ambiguous
    }

    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }

    /// Dash-joined value ids for one member per dimension, if all resolve.
    pub fn key_for(&self, path: &[String]) -> Option<String> {
        if path.len() != self.dimensions.len() {
            return None;
        }
        let ids = path
            .iter()
            .zip(&self.dimensions)
            .map(|(name, members)| members.get(name).map(i64::to_string))
            .collect::<Option<Vec<_>>>()?;
        Some(ids.join("-"))
    }
}

/// Display expression for a value in the given locale.
pub fn value_format(uom_code: Option<u32>, locale: &str) -> String {
    match uom_code {
        Some(223) => format!("Format(iv.value, 'N0', '{locale}')"),
        Some(81) => format!("Format(iv.value, 'C0', '{locale}')"),
        Some(239) => format!("Format(iv.value/100, 'P1', '{locale}')"),
        _ => format!("Format(iv.value, 'N', '{locale}')"),
    }
}

/// Query the presentation layer runs to draw an indicator's map.
pub fn primary_query(indicator_id: i64, uom_code: Option<u32>) -> String {
    let en = value_format(uom_code, LOCALE_EN);
    let fr = value_format(uom_code, LOCALE_FR);
    let query = format!(
        "SELECT iv.value AS Value, \
         CASE WHEN iv.value IS NULL THEN nr.symbol ELSE {en} END AS FormattedValue_EN, \
         CASE WHEN iv.value IS NULL THEN nr.symbol ELSE {fr} END AS FormattedValue_FR, \
         grfi.GeographyReferenceId, g.DisplayNameShort_EN, g.DisplayNameShort_FR, \
         g.DisplayNameLong_EN, g.DisplayNameLong_FR, g.ProvTerrName_EN, g.ProvTerrName_FR, \
         g.Shape, i.IndicatorName_EN, i.IndicatorName_FR, i.IndicatorId, i.IndicatorDisplay_EN, \
         i.IndicatorDisplay_FR, i.UOM_EN, i.UOM_FR, g.GeographicLevelId, gl.LevelName_EN, \
         gl.LevelName_FR, gl.LevelDescription_EN, gl.LevelDescription_FR, g.EntityName_EN, \
         g.EntityName_FR, nr.Symbol, nr.Description_EN AS NullDescription_EN, \
         nr.Description_FR AS NullDescription_FR \
         FROM gis.geographyreference AS g \
         INNER JOIN gis.geographyreferenceforindicator AS grfi \
         ON g.geographyreferenceid = grfi.geographyreferenceid \
         INNER JOIN (SELECT * FROM gis.indicator WHERE indicatorId = {indicator_id}) AS i \
         ON grfi.indicatorid = i.indicatorid \
         INNER JOIN gis.geographiclevel AS gl ON g.geographiclevelid = gl.geographiclevelid \
         INNER JOIN gis.geographiclevelforindicator AS glfi \
         ON i.indicatorid = glfi.indicatorid AND gl.geographiclevelid = glfi.geographiclevelid \
         INNER JOIN gis.indicatorvalues AS iv ON iv.indicatorvalueid = grfi.indicatorvalueid \
         INNER JOIN gis.indicatortheme AS it ON i.indicatorthemeid = it.indicatorthemeid \
         LEFT OUTER JOIN gis.indicatornullreason AS nr ON iv.nullreasonid = nr.nullreasonid"
    );
    truncate_chars(&query, QUERY_MAX)
}

/// Query comparing an indicator with its related indicators.
pub fn related_query(related: &[i64]) -> String {
    let ids = join_ids(related);
    let query = format!(
        "SELECT i.IndicatorId, i.IndicatorName_EN, i.IndicatorName_FR, \
         grfi.GeographyReferenceId, grfi.ReferencePeriod, iv.Value \
         FROM gis.indicator AS i \
         INNER JOIN gis.geographyreferenceforindicator AS grfi ON i.indicatorid = grfi.indicatorid \
         INNER JOIN gis.indicatorvalues AS iv ON iv.indicatorvalueid = grfi.indicatorvalueid \
         WHERE i.indicatorid IN ({ids})"
    );
    truncate_chars(&query, QUERY_MAX)
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",")
}

/// Related indicator ids per indicator, from generic-code grouping.
///
/// Group members are listed in id order, excluding the indicator itself and
/// capped at [`RELATED_INDICATOR_LIMIT`]. An indicator alone in its group
/// lists itself.
pub fn related_indicators(indicators: &[PublishedIndicator]) -> HashMap<i64, Vec<i64>> {
    let mut groups: HashMap<String, Vec<i64>> = HashMap::new();
    for indicator in indicators {
        let key = generic_code(&indicator.candidate.code)
            .unwrap_or_else(|| indicator.candidate.code.clone());
        groups.entry(key).or_default().push(indicator.id);
    }
    for ids in groups.values_mut() {
        ids.sort_unstable();
    }

    indicators
        .iter()
        .map(|indicator| {
            let key = generic_code(&indicator.candidate.code)
                .unwrap_or_else(|| indicator.candidate.code.clone());
            let mut related: Vec<i64> = groups
                .get(&key)
                .map(|ids| {
                    ids.iter()
                        .copied()
                        .filter(|id| *id != indicator.id)
                        .take(RELATED_INDICATOR_LIMIT)
                        .collect()
                })
                .unwrap_or_default();
            if related.is_empty() {
                related.push(indicator.id);
            }
            (indicator.id, related)
        })
        .collect()
}

/// Presentation values of one metadata row: curated values first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub breaks_algorithm_id: i64,
    pub breaks: i64,
    pub primary_chart_type_id: i64,
    pub color_to: String,
    pub color_from: String,
}

impl Presentation {
    pub fn resolve(defaults: &ProductDefaults, curated: Option<&CuratedMetadata>) -> Self {
        let curated = curated.cloned().unwrap_or_default();
        Self {
            breaks_algorithm_id: curated
                .default_breaks_algorithm_id
                .unwrap_or(defaults.default_breaks_algorithm_id),
            breaks: curated.default_breaks.unwrap_or(defaults.default_breaks),
            primary_chart_type_id: curated
                .primary_chart_type_id
                .unwrap_or(defaults.primary_chart_type_id),
            color_to: truncate_chars(
                &curated.color_to.unwrap_or_else(|| defaults.color_to.clone()),
                COLOR_MAX,
            ),
            color_from: truncate_chars(
                &curated.color_from.unwrap_or_else(|| defaults.color_from.clone()),
                COLOR_MAX,
            ),
        }
    }
}

/// IndicatorMetaData rows; unresolved dimension keys are logged and left null.
pub fn metadata_frame(
    indicators: &[PublishedIndicator],
    defaults: &ProductDefaults,
    curated: &HashMap<String, CuratedMetadata>,
    keys: &DimensionKeyIndex,
    warnings: &mut WarningLog,
) -> Result<DataFrame> {
    let n = indicators.len();
    let mut ids = Vec::with_capacity(n);
    let mut alias_en = Vec::with_capacity(n);
    let mut alias_fr = Vec::with_capacity(n);
    let mut formats = Vec::with_capacity(n);
    let mut algorithms = Vec::with_capacity(n);
    let mut breaks = Vec::with_capacity(n);
    let mut charts = Vec::with_capacity(n);
    let mut queries = Vec::with_capacity(n);
    let mut color_to = Vec::with_capacity(n);
    let mut color_from = Vec::with_capacity(n);
    let mut unique_keys = Vec::with_capacity(n);

    for indicator in indicators {
        let candidate = &indicator.candidate;
        let presentation = Presentation::resolve(defaults, curated.get(&candidate.code));
        let key = keys.key_for(&candidate.dimension_path());
        if key.is_none() {
            warnings.record(UnresolvedKind::DimensionKey, candidate.code.clone());
        }

        ids.push(indicator.id);
        alias_en.push(truncate_chars(&candidate.uom.en, FIELD_ALIAS_MAX));
        alias_fr.push(truncate_chars(&candidate.uom.fr, FIELD_ALIAS_MAX));
        formats.push(candidate.uom.code.map(i64::from));
        algorithms.push(presentation.breaks_algorithm_id);
        breaks.push(presentation.breaks);
        charts.push(presentation.primary_chart_type_id);
        queries.push(primary_query(indicator.id, candidate.uom.code));
        color_to.push(presentation.color_to);
        color_from.push(presentation.color_from);
        unique_keys.push(key.map(|k| truncate_chars(&k, DIMENSION_UNIQUE_KEY_MAX)));
    }

    Ok(DataFrame::new(vec![
        i64_column(c::METADATA_ID, ids.clone()),
        i64_column(c::INDICATOR_ID, ids.clone()),
        str_column(c::FIELD_ALIAS_EN, alias_en),
        str_column(c::FIELD_ALIAS_FR, alias_fr),
        opt_i64_column(c::DATA_FORMAT_ID, formats),
        i64_column(c::BREAKS_ALGORITHM_ID, algorithms),
        i64_column(c::DEFAULT_BREAKS, breaks),
        i64_column(c::PRIMARY_CHART_TYPE_ID, charts),
        str_column(c::PRIMARY_QUERY, queries),
        str_column(c::COLOR_TO, color_to),
        str_column(c::COLOR_FROM, color_from),
        opt_str_column(c::DIMENSION_UNIQUE_KEY, unique_keys),
        i64_column(c::DEFAULT_RELATED_CHART_ID, ids),
    ])?)
}

/// RelatedCharts rows, one per indicator, keyed by IndicatorId.
pub fn related_charts_frame(
    indicators: &[PublishedIndicator],
    defaults: &ProductDefaults,
) -> Result<DataFrame> {
    let related = related_indicators(indicators);
    let n = indicators.len();
    let mut queries = Vec::with_capacity(n);
    let mut lists = Vec::with_capacity(n);
    for indicator in indicators {
        let ids = related.get(&indicator.id).cloned().unwrap_or_default();
        let mut charted = vec![indicator.id];
        charted.extend(ids.iter().copied().filter(|id| *id != indicator.id));
        queries.push(related_query(&charted));
        lists.push(join_ids(&ids));
    }
    let ids: Vec<i64> = indicators.iter().map(|i| i.id).collect();
    Ok(DataFrame::new(vec![
        i64_column(c::RELATED_CHART_ID, ids.clone()),
        str_column(
            c::CHART_TITLE_EN,
            indicators.iter().map(|i| i.candidate.long_name_en()).collect(),
        ),
        str_column(
            c::CHART_TITLE_FR,
            indicators.iter().map(|i| i.candidate.long_name_fr()).collect(),
        ),
        str_column(c::QUERY, queries),
        i64_column(c::DEFAULT_CHART_TYPE_ID, vec![defaults.related_chart_type(); n]),
        i64_column(c::INDICATOR_ID, ids),
        str_column(c::RELATED_INDICATOR_IDS, lists),
    ])?)
}
