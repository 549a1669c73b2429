use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use csge_model::ProductId;

use crate::error::{Result, SourceError};
use crate::wds::{CodeSets, CubeMetadata};

/// Narrow interface to the remote metadata source.
pub trait MetadataProvider {
    fn cube_metadata(&self, product_id: ProductId) -> Result<CubeMetadata>;

    /// Products whose data changed on `date`.
    fn changed_cube_list(&self, date: NaiveDate) -> Result<Vec<ProductId>>;

    fn code_sets(&self) -> Result<CodeSets>;
}

/// Metadata provider backed by fixtures held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    cubes: HashMap<ProductId, CubeMetadata>,
    changed: BTreeMap<NaiveDate, Vec<ProductId>>,
    code_sets: CodeSets,
}

impl InMemoryProvider {
    pub fn new(code_sets: CodeSets) -> Self {
        Self {
            code_sets,
            ..Self::default()
        }
    }

    pub fn with_cube(mut self, product_id: ProductId, metadata: CubeMetadata) -> Self {
        self.cubes.insert(product_id, metadata);
        self
    }

    pub fn with_changed(mut self, date: NaiveDate, product_ids: Vec<ProductId>) -> Self {
        self.changed.insert(date, product_ids);
        self
    }
}

impl MetadataProvider for InMemoryProvider {
    fn cube_metadata(&self, product_id: ProductId) -> Result<CubeMetadata> {
        self.cubes
            .get(&product_id)
            .cloned()
            .ok_or(SourceError::UnknownProduct(product_id))
    }

    fn changed_cube_list(&self, date: NaiveDate) -> Result<Vec<ProductId>> {
        Ok(self.changed.get(&date).cloned().unwrap_or_default())
    }

    fn code_sets(&self) -> Result<CodeSets> {
        Ok(self.code_sets.clone())
    }
}
