//! Geography identifier (DGUID) repair and geographic levels.
//!
//! A DGUID is `{vintage:4}{type:1}{schema:4}{instance}`, e.g.
//! `2016A000235` for Ontario under the 2016 vintage. Extracts carry a
//! number of legacy and mistyped forms that must be repaired before they
//! are joined to the geography reference set.
//!
//! Repair is total and idempotent: a repaired identifier is returned
//! unchanged by a second pass, so retried batches are safe.

use csge_model::SubjectCode;

/// Pseudo-level attached to every indicator for the level selector.
pub const ALL_LEVELS: &str = "SSSS";

/// Legacy level codes folded into the census metropolitan area level.
const CMA_EQUIVALENTS: [&str; 3] = ["S0504", "S0505", "S0506"];
const CMA_LEVEL: &str = "S0503";

/// Padding uses the 2016 vintage from this reference year on, 2011 before.
pub const PADDING_CUTOFF_YEAR: i32 = 2016;
const PROVINCE_SCHEMA: &str = "A0002";

/// Metropolitan areas published under the 2016 vintage move to the 2021
/// vintage for data from this reference year on.
pub const VINTAGE_CUTOFF_YEAR: i32 = 2021;
const OBSOLETE_VINTAGE: &str = "2016";
const CURRENT_VINTAGE: &str = "2021";
const VINTAGE_CLASSES: [&str; 4] = ["S0503", "S0504", "S0505", "S0506"];

/// Known one-off identifier typos, applied in order.
const CENSUS_TYPOS: [(&str, &str); 3] = [
    ("2O16", "2016"),
    ("2016A00011124", "2016A000011124"),
    ("2011A00011124", "2011A000011124"),
];

/// Health regions republished under the 2018 boundary file.
const HEALTH_REGION_FIXES: [(&str, &str); 2] = [
    ("2017A000559", "2018A000559"),
    ("2017A000524", "2018A000524"),
];

/// Rule set applied to a product's geography identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeographyRules {
    /// Census geography: vintage padding, typo table, vintage substitution.
    Census,
    /// Health-region geography: boundary-file substitutions only.
    HealthRegion,
}

impl GeographyRules {
    pub fn for_subject(subject: SubjectCode) -> Self {
        if subject == SubjectCode::HEALTH {
            Self::HealthRegion
        } else {
            Self::Census
        }
    }

    /// Repair one identifier observed for `ref_year`.
    pub fn repair(self, raw: &str, ref_year: i32) -> String {
        let dguid = normalize(raw);
        match self {
            Self::Census => {
                let padded = pad_legacy(&dguid, ref_year);
                let fixed = replace_all(padded, &CENSUS_TYPOS);
                substitute_vintage(fixed, ref_year)
            }
            Self::HealthRegion => replace_all(dguid, &HEALTH_REGION_FIXES),
        }
    }
}

/// Repair an identifier with the rules of the product's subject.
pub fn repair_dguid(subject: SubjectCode, raw: &str, ref_year: i32) -> String {
    GeographyRules::for_subject(subject).repair(raw, ref_year)
}

/// Level code embedded in a DGUID, with legacy equivalents folded.
pub fn geographic_level(dguid: &str) -> Option<&str> {
    let level = dguid.get(4..9)?;
    if CMA_EQUIVALENTS.contains(&level) {
        Some(CMA_LEVEL)
    } else {
        Some(level)
    }
}

/// Separators removed and the truncated `201A` vintage expanded.
fn normalize(raw: &str) -> String {
    raw.trim().replace('.', "").replace("201A", "2015A")
}

fn pad_legacy(dguid: &str, ref_year: i32) -> String {
    let vintage = if ref_year >= PADDING_CUTOFF_YEAR {
        "2016"
    } else {
        "2011"
    };
    let bytes = dguid.as_bytes();
    match bytes {
        // Bare two-digit province code.
        [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => {
            format!("{vintage}{PROVINCE_SCHEMA}{dguid}")
        }
        // Type and schema without a vintage.
        [first, rest @ ..]
            if first.is_ascii_uppercase()
                && rest.len() >= 4
                && rest.iter().all(u8::is_ascii_digit) =>
        {
            format!("{vintage}{dguid}")
        }
        _ => dguid.to_string(),
    }
}

fn replace_all(mut dguid: String, rules: &[(&str, &str)]) -> String {
    for (from, to) in rules {
        if dguid.contains(from) {
            dguid = dguid.replace(from, to);
        }
    }
    dguid
}

fn substitute_vintage(dguid: String, ref_year: i32) -> String {
    if ref_year < VINTAGE_CUTOFF_YEAR || !dguid.starts_with(OBSOLETE_VINTAGE) {
        return dguid;
    }
    match geographic_class(&dguid) {
        Some(class) if VINTAGE_CLASSES.contains(&class) => {
            format!("{CURRENT_VINTAGE}{}", &dguid[OBSOLETE_VINTAGE.len()..])
        }
        _ => dguid,
    }
}

/// Raw type and schema of a DGUID, without folding.
fn geographic_class(dguid: &str) -> Option<&str> {
    dguid.get(4..9)
}
