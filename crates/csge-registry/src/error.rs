use std::path::PathBuf;

use csge_model::ProductId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("product defaults file {path} has no \"default\" entry")]
    MissingDefaults { path: PathBuf },

    #[error("product {product_id} already belongs to the merge group of {master}")]
    GroupConflict {
        product_id: ProductId,
        master: ProductId,
    },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
