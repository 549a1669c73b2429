//! Application configuration (`csge.toml`).
//!
//! Lookup order: an explicit path, then the `CSGE_CONFIG` environment
//! variable, then `./csge.toml`. Only the last one may be absent, in which
//! case the built-in defaults apply.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use csge_model::{ProductId, SubjectCode};

use crate::error::{RegistryError, Result};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CSGE_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "csge.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub wds: WdsConfig,
    pub paths: PathsConfig,
    pub pipeline: PipelineConfig,
    pub mixed_geography: MixedGeographyConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WdsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for WdsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www150.statcan.gc.ca/t1/wds/rest/".to_string(),
            timeout_secs: 120,
        }
    }
}

impl WdsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one CSV per relational table.
    pub store_dir: PathBuf,
    /// Directory of unzipped full-table extracts.
    pub extract_dir: PathBuf,
    pub merge_registry: PathBuf,
    pub product_defaults: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("store"),
            extract_dir: PathBuf::from("extracts"),
            merge_registry: PathBuf::from("merge_products.json"),
            product_defaults: PathBuf::from("product_defaults.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extract rows per batch.
    pub chunk_size: usize,
    pub delimiter: char,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100_000,
            delimiter: ',',
        }
    }
}

/// Products whose older reference years only exist at coarse geography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixedGeographyConfig {
    pub product_ids: Vec<ProductId>,
    pub subject_codes: Vec<u8>,
    /// Default minimum reference year; `--minrefyear` overrides it.
    pub min_ref_year: Option<i32>,
    /// Geographic levels kept below the minimum reference year.
    pub coarse_levels: Vec<String>,
}

impl Default for MixedGeographyConfig {
    fn default() -> Self {
        Self {
            product_ids: Vec::new(),
            subject_codes: vec![SubjectCode::HEALTH.get()],
            min_ref_year: None,
            coarse_levels: vec!["A0000".to_string(), "A0002".to_string(), "S0500".to_string()],
        }
    }
}

impl MixedGeographyConfig {
    pub fn applies_to(&self, product_id: ProductId) -> bool {
        self.product_ids.contains(&product_id)
            || self.subject_codes.contains(&product_id.subject().get())
    }

    pub fn is_coarse(&self, level: &str) -> bool {
        self.coarse_levels.iter().any(|l| l == level)
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.chunk_size == 0 {
            return Err(RegistryError::InvalidConfig {
                reason: "pipeline.chunk_size must be greater than zero".to_string(),
            });
        }
        if !self.pipeline.delimiter.is_ascii() {
            return Err(RegistryError::InvalidConfig {
                reason: format!(
                    "pipeline.delimiter must be an ASCII character, got {:?}",
                    self.pipeline.delimiter
                ),
            });
        }
        if self.wds.base_url.trim().is_empty() {
            return Err(RegistryError::InvalidConfig {
                reason: "wds.base_url must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.pipeline.delimiter).unwrap_or(b',')
    }
}

/// Where the config comes from and whether it has to exist.
fn locate(explicit: Option<&Path>) -> (PathBuf, bool) {
    if let Some(path) = explicit {
        return (path.to_path_buf(), true);
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return (PathBuf::from(path), true);
    }
    (PathBuf::from(DEFAULT_CONFIG_FILE), false)
}

/// Load the application config.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let (path, required) = locate(explicit);
    if !path.exists() {
        if required {
            return Err(RegistryError::ConfigNotFound { path });
        }
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(AppConfig::default());
    }
    let config = read_config(&path)?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Parse and validate a config file.
pub fn read_config(path: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = toml::from_str(&contents).map_err(|source| RegistryError::Toml {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}
