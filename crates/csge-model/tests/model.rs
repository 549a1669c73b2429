use csge_model::{Frequency, MergeRole, ModelError, ProductId, Table};

fn pid(raw: &str) -> ProductId {
    raw.parse().unwrap()
}

#[test]
fn product_id_accepts_table_numbers() {
    assert_eq!(pid("46-10-0027-01"), pid("46100027"));
    assert_eq!(pid(" 4610002701 ").get(), 46100027);
}

#[test]
fn product_id_rejects_malformed_values() {
    assert!(matches!(
        "4610002".parse::<ProductId>(),
        Err(ModelError::InvalidProductId(_))
    ));
    assert!("4610002x".parse::<ProductId>().is_err());
    assert!(ProductId::new(1234).is_err());
}

#[test]
fn product_id_serializes_as_string() {
    let json = serde_json::to_string(&pid("13100778")).unwrap();
    assert_eq!(json, "\"13100778\"");
    let back: ProductId = serde_json::from_str("\"13-10-0778\"").unwrap();
    assert_eq!(back, pid("13100778"));
}

#[test]
fn frequency_codes_map_to_year_steps() {
    assert_eq!(Frequency::from_code(12).unwrap().year_step(), 1);
    assert_eq!(Frequency::from_code(16).unwrap().year_step(), 5);
    assert_eq!(
        Frequency::from_code(6),
        Err(ModelError::UnsupportedFrequency(6))
    );
}

#[test]
fn delete_order_ends_with_indicator() {
    assert_eq!(Table::DELETE_ORDER.first(), Some(&Table::RelatedCharts));
    assert_eq!(Table::DELETE_ORDER.last(), Some(&Table::Indicator));
    assert!(Table::DELETE_ORDER.iter().all(|t| !t.is_reference()));
}

#[test]
fn table_names_round_trip() {
    for table in Table::ALL {
        assert_eq!(table.name().parse::<Table>().unwrap(), table);
        assert!(!table.columns().is_empty());
    }
    assert!("Nope".parse::<Table>().is_err());
}

#[test]
fn sibling_publishes_under_master() {
    let master = pid("46100053");
    let sibling = pid("46100054");
    let role = MergeRole::Sibling { master };
    assert_eq!(role.functional_product_id(sibling), master);
    assert!(!role.owns_indicators());

    let role = MergeRole::Master {
        siblings: vec![sibling],
    };
    assert_eq!(role.functional_product_id(master), master);
    assert_eq!(role.to_string(), "master");
}
