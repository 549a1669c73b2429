//! Tests for indicator generation and code derivation.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use proptest::prelude::*;

use csge_core::combinatorics::{Axis, combine_axes, generate_candidates, select_candidates};
use csge_core::indicator_code::{extract_row_code, fix_ref_year, generic_code, indicator_code};
use csge_core::CoreError;
use csge_model::{Dimension, DimensionMember, Frequency, ProductId, UnitOfMeasure};
use csge_source::ProductDescriptor;

fn pid(raw: &str) -> ProductId {
    raw.parse().unwrap()
}

fn member(id: u32, name: &str, uom_code: Option<u32>) -> DimensionMember {
    DimensionMember {
        member_id: id,
        name_en: name.to_string(),
        name_fr: format!("{name} (fr)"),
        uom_code,
    }
}

fn dimension(position: u32, name: &str, members: Vec<DimensionMember>) -> Dimension {
    Dimension {
        position,
        name_en: name.to_string(),
        name_fr: name.to_string(),
        members,
    }
}

fn descriptor(dimensions: Vec<Dimension>, years: Vec<i32>) -> ProductDescriptor {
    let mut units = BTreeMap::new();
    units.insert(
        223,
        UnitOfMeasure {
            code: Some(223),
            en: "Number".to_string(),
            fr: "Nombre".to_string(),
        },
    );
    ProductDescriptor {
        product_id: pid("46100027"),
        title_en: "Residential properties".to_string(),
        title_fr: "Propriétés résidentielles".to_string(),
        subject_en: "Housing".to_string(),
        survey_code: None,
        release_date: NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
        frequency: Frequency::Annual,
        reference_years: years,
        dimensions,
        geography_position: None,
        units,
    }
}

fn sex_by_age() -> Vec<Dimension> {
    vec![
        dimension(2, "Sex", vec![member(1, "Male", None), member(2, "Female", None)]),
        dimension(3, "Age", vec![member(1, "<15", Some(223)), member(2, "15+", Some(223))]),
    ]
}

// ============================================================================
// Candidate generation
// ============================================================================

#[test]
fn sex_by_age_yields_four_indicators() {
    let candidates = generate_candidates(&descriptor(sex_by_age(), vec![2020])).unwrap();

    let codes: Vec<&str> = candidates.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(
        codes,
        vec![
            "46100027.1.1.2020-01-01",
            "46100027.1.2.2020-01-01",
            "46100027.2.1.2020-01-01",
            "46100027.2.2.2020-01-01",
        ]
    );
    let names: Vec<String> = candidates.iter().map(|c| c.long_name_en()).collect();
    assert_eq!(names, vec!["Male _ <15", "Male _ 15+", "Female _ <15", "Female _ 15+"]);
    assert!(candidates.iter().all(|c| c.uom.en == "Number"));
    assert_eq!(candidates[0].reference_period(), "2020-01-01");
}

#[test]
fn display_list_leads_with_the_year() {
    let candidates = generate_candidates(&descriptor(sex_by_age(), vec![2020])).unwrap();
    insta::assert_snapshot!(candidates[1].display_en(), @"<ul><li>2020<li>Male<li>15+</li></ul>");
    insta::assert_snapshot!(candidates[1].display_fr(), @"<ul><li>2020<li>Male (fr)<li>15+ (fr)</li></ul>");
}

#[test]
fn short_name_keeps_last_two_members() {
    let mut dims = sex_by_age();
    dims.insert(0, dimension(1, "Tenure", vec![member(4, "Owner", None)]));
    let candidates = generate_candidates(&descriptor(dims, vec![2020])).unwrap();
    assert_eq!(candidates[0].name_en(), "Male _ <15");
    assert_eq!(candidates[0].long_name_en(), "Owner _ Male _ <15");
    assert_eq!(candidates[0].code, "46100027.4.1.1.2020-01-01");
}

#[test]
fn candidates_are_combination_major() {
    let candidates = generate_candidates(&descriptor(sex_by_age(), vec![2019, 2020])).unwrap();
    let first: Vec<(&str, i32)> = candidates
        .iter()
        .take(3)
        .map(|c| (c.coordinate.as_str(), c.ref_year))
        .collect();
    assert_eq!(first, vec![("1.1", 2019), ("1.1", 2020), ("1.2", 2019)]);
}

#[test]
fn year_filter_applies_before_ids() {
    let candidates = generate_candidates(&descriptor(sex_by_age(), vec![2015, 2020])).unwrap();
    let kept = select_candidates(candidates, |year| year >= 2016);
    assert_eq!(kept.len(), 4);
    assert!(kept.iter().all(|c| c.ref_year == 2020));
}

#[test]
fn unequal_member_lists_fail_before_combining() {
    let axis = Axis {
        label: "Sex".to_string(),
        member_ids: vec![1, 2],
        names_en: vec!["Male".to_string(), "Female".to_string()],
        names_fr: vec!["Hommes".to_string()],
        uom_codes: vec![None, None],
    };
    let err = combine_axes(pid("46100027"), &[axis]).unwrap_err();
    assert!(matches!(err, CoreError::MalformedMetadata { .. }));
}

#[test]
fn missing_years_are_malformed() {
    let err = generate_candidates(&descriptor(sex_by_age(), Vec::new())).unwrap_err();
    assert!(matches!(err, CoreError::MalformedMetadata { .. }));
}

// ============================================================================
// Codes
// ============================================================================

#[test]
fn extract_codes_match_generated_codes() {
    let product = pid("46100027");
    assert_eq!(
        extract_row_code(product, "3.1.2", Some(1), 2020),
        indicator_code(product, "1.2", 2020)
    );
    assert_eq!(
        extract_row_code(product, "1.2.3", Some(2), fix_ref_year("2019/2020").unwrap()),
        "46100027.1.3.2020-01-01"
    );
}

#[test]
fn generic_code_groups_by_all_but_last_member() {
    let first = generic_code("P.1.1.1.2020").unwrap();
    let second = generic_code("P.1.1.2.2020").unwrap();
    let third = generic_code("P.1.2.1.2020").unwrap();
    assert_eq!(first, "P.1.1.*.2020");
    assert_eq!(first, second);
    assert_ne!(first, third);
    assert_eq!(generic_code("P.2020"), None);
}

// ============================================================================
// Properties
// ============================================================================

fn dimensions_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 1..4)
}

fn build_dimensions(sizes: &[usize]) -> Vec<Dimension> {
    sizes
        .iter()
        .enumerate()
        .map(|(d, size)| {
            let members = (1..=*size as u32)
                .map(|id| member(id, &format!("d{d}m{id}"), None))
                .collect();
            dimension(d as u32 + 1, &format!("Dimension {d}"), members)
        })
        .collect()
}

proptest! {
    #[test]
    fn cardinality_is_members_times_years(sizes in dimensions_strategy(), years in 1usize..5) {
        let years: Vec<i32> = (0..years as i32).map(|y| 2010 + y).collect();
        let candidates = generate_candidates(&descriptor(build_dimensions(&sizes), years.clone())).unwrap();

        let expected = sizes.iter().product::<usize>() * years.len();
        prop_assert_eq!(candidates.len(), expected);
        let codes: HashSet<&str> = candidates.iter().map(|c| c.code.as_str()).collect();
        prop_assert_eq!(codes.len(), expected);
    }

    #[test]
    fn codes_are_deterministic(sizes in dimensions_strategy(), year in 1990i32..2030) {
        let desc = descriptor(build_dimensions(&sizes), vec![year]);
        let first = generate_candidates(&desc).unwrap();
        let second = generate_candidates(&desc).unwrap();
        prop_assert_eq!(first, second);
    }
}
