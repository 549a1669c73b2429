//! Polars column helpers.
//!
//! Row batches move through the loader as Polars `DataFrame`s. These helpers
//! read a whole column into plain Rust values (casting non-strictly, so
//! unparsable cells become nulls) and build typed columns back from vectors.

use polars::prelude::{Column, DataFrame, DataType, IntoColumn, NamedFrom, PolarsResult, Series};

/// Formats a floating-point number without trailing zeros.
///
/// ```
/// use csge_common::format_numeric;
///
/// assert_eq!(format_numeric(1.0), "1");
/// assert_eq!(format_numeric(0.0), "0");
/// assert_eq!(format_numeric(2.25), "2.25");
/// ```
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if !s.contains('.') {
        return s;
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parses a string as `f64`, returning `None` for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Parses a string as `i64`, returning `None` for invalid or empty strings.
pub fn parse_i64(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<i64>().ok()
}

/// Truncates a string to at most `max` characters (not bytes).
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Reads a column as strings. Nulls become empty strings.
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<String>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.unwrap_or_default().to_string())
        .collect())
}

/// Reads a column as optional floats. Cells that do not parse become `None`.
pub fn opt_f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Reads a column as optional integers.
pub fn opt_i64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

/// Reads a column as integers, skipping nulls.
pub fn i64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<i64>> {
    Ok(opt_i64_values(df, name)?.into_iter().flatten().collect())
}

pub fn str_column(name: &str, values: Vec<String>) -> Column {
    Series::new(name.into(), values).into_column()
}

pub fn opt_str_column(name: &str, values: Vec<Option<String>>) -> Column {
    Series::new(name.into(), values).into_column()
}

pub fn i64_column(name: &str, values: Vec<i64>) -> Column {
    Series::new(name.into(), values).into_column()
}

pub fn opt_i64_column(name: &str, values: Vec<Option<i64>>) -> Column {
    Series::new(name.into(), values).into_column()
}

pub fn f64_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Series::new(name.into(), values).into_column()
}
