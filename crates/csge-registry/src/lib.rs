//! Configuration and on-disk registries for the CSGE loader.

pub mod config;
pub mod error;
pub mod merge_groups;
pub mod product_defaults;

pub use config::{
    AppConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE, MixedGeographyConfig, PathsConfig,
    PipelineConfig, WdsConfig, load_config, read_config,
};
pub use error::{RegistryError, Result};
pub use merge_groups::MergeRegistry;
pub use product_defaults::{DEFAULT_KEY, ProductDefaults, ProductDefaultsFile};
