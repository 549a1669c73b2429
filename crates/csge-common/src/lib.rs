//! Shared utilities for the CSGE indicator loader crates.
//!
//! This crate provides the Polars helpers used across the workspace to pull
//! typed values out of row batches and to build output columns.

pub mod polars;

pub use polars::{
    f64_column, format_numeric, i64_column, i64_values, opt_f64_values, opt_i64_column,
    opt_i64_values, opt_str_column, parse_f64, parse_i64, str_column, string_values,
    truncate_chars,
};
