//! Tests for flag combinations and their requests.

use chrono::NaiveDate;
use clap::Parser;

use csge_cli::cli::{ArgumentError, Cli, Request};
use csge_cli::summary::describe_request;
use csge_model::ProductId;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("csge").chain(args.iter().copied())).unwrap()
}

fn request(args: &[&str]) -> Result<Request, ArgumentError> {
    parse(args).request()
}

fn pid(raw: &str) -> ProductId {
    raw.parse().unwrap()
}

fn date(raw: &str) -> NaiveDate {
    raw.parse().unwrap()
}

// ============================================================================
// Accepted requests
// ============================================================================

#[test]
fn single_product_is_rebuilt() {
    assert_eq!(request(&["--prodid", "46100027"]), Ok(Request::Product(pid("46100027"))));
}

#[test]
fn table_numbers_are_accepted_as_product_ids() {
    assert_eq!(
        request(&["--prodid", "46-10-0027-01"]),
        Ok(Request::Product(pid("46100027")))
    );
}

#[test]
fn insert_keeps_every_id_in_order() {
    assert_eq!(
        request(&["-i", "--prodid", "46100053", "46100054"]),
        Ok(Request::Insert(vec![pid("46100053"), pid("46100054")]))
    );
}

#[test]
fn range_includes_a_single_day() {
    assert_eq!(
        request(&["--start", "2021-03-01", "--end", "2021-03-01"]),
        Ok(Request::Range {
            start: date("2021-03-01"),
            end: date("2021-03-01"),
        })
    );
}

#[test]
fn run_flags_are_parsed() {
    let cli = parse(&["--prodid", "46100027", "--minrefyear", "2016", "--dry-run"]);
    assert_eq!(cli.min_ref_year, Some(2016));
    assert!(cli.dry_run);
    assert!(cli.config.is_none());
}

// ============================================================================
// Rejected combinations
// ============================================================================

#[test]
fn insert_needs_a_product() {
    assert_eq!(request(&["-i"]), Err(ArgumentError::InsertWithoutProduct));
}

#[test]
fn end_before_start_is_rejected() {
    assert_eq!(
        request(&["--start", "2021-03-02", "--end", "2021-03-01"]),
        Err(ArgumentError::EndBeforeStart)
    );
}

#[test]
fn product_and_dates_are_exclusive() {
    assert_eq!(
        request(&["--prodid", "46100027", "--start", "2021-03-01"]),
        Err(ArgumentError::ProductWithDates)
    );
    assert_eq!(
        request(&["--prodid", "46100027", "--start", "2021-03-01", "--end", "2021-03-02"]),
        Err(ArgumentError::ProductWithDates)
    );
}

#[test]
fn half_open_range_is_rejected() {
    assert_eq!(request(&["--end", "2021-03-01"]), Err(ArgumentError::HalfOpenRange));
}

#[test]
fn several_products_need_insert() {
    assert_eq!(
        request(&["--prodid", "46100053", "46100054"]),
        Err(ArgumentError::SeveralProducts)
    );
}

#[test]
fn no_arguments_is_rejected() {
    let err = request(&[]).unwrap_err();
    insta::assert_snapshot!(err, @"No arguments were received.");
}

#[test]
fn malformed_product_id_fails_parsing() {
    assert!(Cli::try_parse_from(["csge", "--prodid", "4610"]).is_err());
    assert!(Cli::try_parse_from(["csge", "--start", "2021/03/01"]).is_err());
}

// ============================================================================
// Descriptions
// ============================================================================

#[test]
fn requests_describe_themselves() {
    insta::assert_snapshot!(
        describe_request(&Request::Insert(vec![pid("46100053"), pid("46100054")])),
        @"insert 46100053 46100054"
    );
    insta::assert_snapshot!(
        describe_request(&Request::Range {
            start: date("2021-03-01"),
            end: date("2021-03-05"),
        }),
        @"rebuild products released 2021-03-01 to 2021-03-05"
    );
}
