//! CLI argument definitions for the indicator loader.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use csge_model::ProductId;

use crate::logging::LogFormat;

#[derive(Parser)]
#[command(
    name = "csge",
    version,
    about = "Load statistical products into the geographic indicator store",
    long_about = "Rebuild the indicator, value and chart rows of statistical products.\n\n\
                  Use --prodid to rebuild one product, --start/--end to rebuild every\n\
                  product released in a date range, or -i to create a new product."
)]
pub struct Cli {
    /// Insert the product as a new product. Without this flag existing products are rebuilt.
    #[arg(short = 'i', long = "insert")]
    pub insert: bool,

    /// Product id to create or rebuild. With -i, several ids are merged into
    /// one product published under the first id; they must share the same
    /// dimension and member structure.
    #[arg(long = "prodid", value_name = "PRODID", num_args = 1..)]
    pub prodid: Vec<ProductId>,

    /// First release date to look for product updates.
    #[arg(long = "start", value_name = "YYYY-MM-DD")]
    pub start: Option<NaiveDate>,

    /// Last release date to look for product updates.
    #[arg(long = "end", value_name = "YYYY-MM-DD")]
    pub end: Option<NaiveDate>,

    /// Drop reference years before this one for mixed-geography products.
    #[arg(long = "minrefyear", value_name = "YEAR")]
    pub min_ref_year: Option<i32>,

    /// Configuration file (default: $CSGE_CONFIG, then ./csge.toml).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run against an in-memory copy of the store and write nothing back.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value_t)]
    pub log_format: LogFormat,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        }
    }
}

/// What one invocation asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Create a product, merging any further ids into the first one.
    Insert(Vec<ProductId>),
    /// Rebuild one product and its merge group.
    Product(ProductId),
    /// Rebuild every known product released between two dates, inclusive.
    Range { start: NaiveDate, end: NaiveDate },
}

/// Rejected flag combination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("Product ID is required for new products created with the -i flag.")]
    InsertWithoutProduct,
    #[error("Start date must be before end date. Please check the date parameters and try again.")]
    EndBeforeStart,
    #[error("Product ID search cannot be combined with start/end dates.")]
    ProductWithDates,
    #[error("Start and end date must both be present to look up products within a date range.")]
    HalfOpenRange,
    #[error("Multiple Product IDs can only be used if creating a new merged product with the -i flag.")]
    SeveralProducts,
    #[error("No arguments were received.")]
    Empty,
}

impl Cli {
    /// Check the flag combination and turn it into a [`Request`].
    pub fn request(&self) -> Result<Request, ArgumentError> {
        if self.insert {
            if self.prodid.is_empty() {
                return Err(ArgumentError::InsertWithoutProduct);
            }
            return Ok(Request::Insert(self.prodid.clone()));
        }
        match (self.prodid.as_slice(), self.start, self.end) {
            ([], Some(start), Some(end)) if end < start => Err(ArgumentError::EndBeforeStart),
            ([], Some(start), Some(end)) => Ok(Request::Range { start, end }),
            ([_, ..], Some(_), _) | ([_, ..], _, Some(_)) => Err(ArgumentError::ProductWithDates),
            (_, Some(_), None) | (_, None, Some(_)) => Err(ArgumentError::HalfOpenRange),
            ([product_id], None, None) => Ok(Request::Product(*product_id)),
            ([_, _, ..], None, None) => Err(ArgumentError::SeveralProducts),
            ([], None, None) => Err(ArgumentError::Empty),
        }
    }
}
