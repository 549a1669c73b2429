//! Logging setup.
//!
//! Events from the loader crates pass at the chosen level and everything
//! else at warn. `RUST_LOG` replaces that filter unless a level flag was
//! given. Output goes to stderr, or with timestamps to `--log-file`.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{ColorChoice, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::Cli;

/// Crates whose events pass the default filter at the configured level.
const CRATES: &[&str] = &[
    "csge",
    "csge_cli",
    "csge_core",
    "csge_ingest",
    "csge_model",
    "csge_registry",
    "csge_source",
    "csge_store",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: LevelFilter,
    /// Let a set `RUST_LOG` replace the level.
    pub honour_env: bool,
    pub format: LogFormat,
    pub ansi: bool,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// `--log-level` wins over `-v`/`-q`; either one ignores `RUST_LOG`.
    pub fn from_cli(cli: &Cli) -> Self {
        let level = cli
            .log_level
            .map_or_else(|| cli.verbosity.tracing_level_filter(), LevelFilter::from);
        let ansi = cli.log_file.is_none()
            && match cli.color.color {
                ColorChoice::Always => true,
                ColorChoice::Never => false,
                ColorChoice::Auto => io::stderr().is_terminal(),
            };
        Self {
            level,
            honour_env: !(cli.verbosity.is_present() || cli.log_level.is_some()),
            format: cli.log_format,
            ansi,
            file: cli.log_file.clone(),
        }
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(settings: &LogSettings) -> io::Result<()> {
    let writer = match &settings.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(io::stderr),
    };
    let timestamps = settings.file.is_some();
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(settings.ansi)
        .with_target(false);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match (settings.format, timestamps) {
        (LogFormat::Json, _) => layer.json().with_current_span(true).boxed(),
        (LogFormat::Compact, true) => layer.compact().boxed(),
        (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
        (LogFormat::Pretty, true) => layer.boxed(),
        (LogFormat::Pretty, false) => layer.without_time().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter(settings))
        .init();
    Ok(())
}

/// Filter directive for our crates at `level`; other crates stay at warn.
pub fn default_directive(level: LevelFilter) -> String {
    let level = level.to_string().to_lowercase();
    CRATES.iter().fold(String::from("warn"), |directive, name| {
        format!("{directive},{name}={level}")
    })
}

fn env_filter(settings: &LogSettings) -> EnvFilter {
    let configured = || EnvFilter::new(default_directive(settings.level));
    if settings.honour_env {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| configured())
    } else {
        configured()
    }
}
