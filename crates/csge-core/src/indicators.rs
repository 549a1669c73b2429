//! Indicator rows of an owning product.

use chrono::NaiveDate;
use polars::prelude::DataFrame;

use csge_common::{i64_column, opt_i64_column, str_column};
use csge_model::{ProductId, columns as c};

use crate::combinatorics::IndicatorCandidate;
use crate::error::Result;
use crate::sequence::IdSequence;
use crate::transform::IndicatorIndex;

/// A candidate with its assigned IndicatorId.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedIndicator {
    pub id: i64,
    pub candidate: IndicatorCandidate,
}

/// Assign consecutive ids from the sequence's next key. The sequence is not
/// advanced; commit the rows first.
pub fn assign_ids(
    candidates: Vec<IndicatorCandidate>,
    sequence: &IdSequence,
) -> Vec<PublishedIndicator> {
    let ids = sequence.reserve(candidates.len());
    ids.zip(candidates)
        .map(|(id, candidate)| PublishedIndicator { id, candidate })
        .collect()
}

pub fn indicator_frame(
    theme_id: ProductId,
    release_date: NaiveDate,
    indicators: &[PublishedIndicator],
) -> Result<DataFrame> {
    let n = indicators.len();
    let text = |f: fn(&IndicatorCandidate) -> String| -> Vec<String> {
        indicators.iter().map(|i| f(&i.candidate)).collect()
    };
    Ok(DataFrame::new(vec![
        i64_column(c::INDICATOR_ID, indicators.iter().map(|i| i.id).collect()),
        str_column(c::INDICATOR_NAME_EN, text(IndicatorCandidate::name_en)),
        str_column(c::INDICATOR_NAME_FR, text(IndicatorCandidate::name_fr)),
        i64_column(c::THEME_ID, vec![theme_id.as_i64(); n]),
        str_column(c::RELEASE_DATE, vec![release_date.format("%Y-%m-%d").to_string(); n]),
        str_column(c::REFERENCE_PERIOD, text(IndicatorCandidate::reference_period)),
        str_column(c::INDICATOR_CODE, text(|cand| cand.code.clone())),
        str_column(c::INDICATOR_DISPLAY_EN, text(IndicatorCandidate::display_en)),
        str_column(c::INDICATOR_DISPLAY_FR, text(IndicatorCandidate::display_fr)),
        str_column(c::UOM_EN, text(|cand| cand.uom.en.clone())),
        str_column(c::UOM_FR, text(|cand| cand.uom.fr.clone())),
        opt_i64_column(c::VECTOR, vec![None; n]),
        str_column(c::INDICATOR_NAME_LONG_EN, text(IndicatorCandidate::long_name_en)),
        str_column(c::INDICATOR_NAME_LONG_FR, text(IndicatorCandidate::long_name_fr)),
    ])?)
}

/// Index of the indicators just published, for the extract join.
pub fn index_of(indicators: &[PublishedIndicator]) -> IndicatorIndex {
    let mut index = IndicatorIndex::new();
    for indicator in indicators {
        index.insert(
            indicator.candidate.code.clone(),
            indicator.id,
            indicator.candidate.uom.en.clone(),
        );
    }
    index
}
