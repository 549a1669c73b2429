//! Command-line driver for the indicator loader.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
pub mod types;
