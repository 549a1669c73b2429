//! Location of unzipped full-table extracts.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use csge_model::ProductId;

use crate::error::{Result, SourceError};

/// Extract language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    Fr,
}

impl Lang {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of full-table CSV extracts.
pub trait ExtractSource {
    /// Path of the unzipped CSV extract for a product in one language.
    fn full_table_download(&self, product_id: ProductId, lang: Lang) -> Result<PathBuf>;
}

/// Extracts already downloaded and unzipped into a working directory.
///
/// Layout: `<root>/<product>-<lang>/<product>.csv`.
#[derive(Debug, Clone)]
pub struct ExtractDirectory {
    root: PathBuf,
}

impl ExtractDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extract_path(&self, product_id: ProductId, lang: Lang) -> PathBuf {
        self.root
            .join(format!("{product_id}-{lang}"))
            .join(format!("{product_id}.csv"))
    }
}

impl ExtractSource for ExtractDirectory {
    fn full_table_download(&self, product_id: ProductId, lang: Lang) -> Result<PathBuf> {
        let path = self.extract_path(product_id, lang);
        if !path.is_file() {
            return Err(SourceError::ExtractMissing {
                product_id,
                lang,
                path,
            });
        }
        Ok(path)
    }
}
