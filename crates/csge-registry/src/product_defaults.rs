//! Per-product presentation defaults for indicator metadata.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use csge_model::ProductId;

use crate::error::{RegistryError, Result};

/// Key of the fallback entry.
pub const DEFAULT_KEY: &str = "default";

/// Chart defaults applied to every indicator of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDefaults {
    pub default_breaks_algorithm_id: i64,
    pub default_breaks: i64,
    pub primary_chart_type_id: i64,
    pub color_to: String,
    pub color_from: String,
    /// Chart type of the related chart; the primary chart type when absent.
    #[serde(default)]
    pub related_chart_type_id: Option<i64>,
}

impl ProductDefaults {
    pub fn related_chart_type(&self) -> i64 {
        self.related_chart_type_id
            .unwrap_or(self.primary_chart_type_id)
    }
}

/// Contents of the product defaults file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDefaultsFile {
    fallback: ProductDefaults,
    products: BTreeMap<String, ProductDefaults>,
}

impl ProductDefaultsFile {
    pub fn new(fallback: ProductDefaults) -> Self {
        Self {
            fallback,
            products: BTreeMap::new(),
        }
    }

    pub fn with_product(mut self, product_id: ProductId, defaults: ProductDefaults) -> Self {
        self.products.insert(product_id.to_string(), defaults);
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut products: BTreeMap<String, ProductDefaults> =
            serde_json::from_str(&contents).map_err(|source| RegistryError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let fallback = products
            .remove(DEFAULT_KEY)
            .ok_or_else(|| RegistryError::MissingDefaults {
                path: path.to_path_buf(),
            })?;
        Ok(Self { fallback, products })
    }

    /// Defaults for a product, falling back to the `default` entry.
    pub fn for_product(&self, product_id: ProductId) -> &ProductDefaults {
        self.products
            .get(&product_id.to_string())
            .unwrap_or(&self.fallback)
    }
}
