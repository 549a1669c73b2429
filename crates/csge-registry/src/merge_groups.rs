//! Registry of merged products.
//!
//! Stored as JSON keyed by master product id:
//!
//! ```json
//! { "46100053": { "linked_tables": ["46100054"] } }
//! ```
//!
//! A missing or unparsable file reads as an empty registry. Only the
//! new-product insert workflow writes to it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use csge_model::{MergeRole, ProductId};

use crate::error::{RegistryError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct GroupEntry {
    #[serde(default)]
    linked_tables: Vec<serde_json::Value>,
}

/// Parsed merge-group registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeRegistry {
    groups: BTreeMap<ProductId, Vec<ProductId>>,
}

impl MergeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the registry file.
    ///
    /// Fails only when the file parses but assigns a product two roles.
    pub fn load(path: &Path) -> Result<Self> {
        let raw: BTreeMap<String, GroupEntry> = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Merge registry is not valid JSON, treating as empty");
                    return Ok(Self::default());
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Merge registry not readable, treating as empty");
                return Ok(Self::default());
            }
        };

        let mut registry = Self::default();
        for (master, entry) in raw {
            let Ok(master) = master.parse::<ProductId>() else {
                warn!(key = %master, "Skipping merge group with invalid master id");
                continue;
            };
            let siblings: Vec<ProductId> = entry
                .linked_tables
                .iter()
                .filter_map(|value| {
                    let text = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let parsed = text.parse::<ProductId>().ok();
                    if parsed.is_none() {
                        warn!(%master, linked = %text, "Skipping invalid linked table id");
                    }
                    parsed
                })
                .filter(|sibling| *sibling != master)
                .collect();
            registry.register_group(master, &siblings)?;
        }
        Ok(registry)
    }

    /// Write the registry back, pretty-printed.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw: BTreeMap<String, GroupEntry> = self
            .groups
            .iter()
            .map(|(master, siblings)| {
                let linked_tables = siblings
                    .iter()
                    .map(|s| serde_json::Value::String(s.to_string()))
                    .collect();
                (master.to_string(), GroupEntry { linked_tables })
            })
            .collect();
        let contents = serde_json::to_string_pretty(&raw).map_err(|source| RegistryError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, contents).map_err(|source| RegistryError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), groups = self.groups.len(), "Saved merge registry");
        Ok(())
    }

    /// Add a merge group, keeping every product in at most one role.
    pub fn register_group(&mut self, master: ProductId, siblings: &[ProductId]) -> Result<()> {
        for product_id in std::iter::once(&master).chain(siblings) {
            if let Some(owner) = self.owning_master(*product_id)
                && owner != master
            {
                return Err(RegistryError::GroupConflict {
                    product_id: *product_id,
                    master: owner,
                });
            }
        }
        let mut ordered: Vec<ProductId> = Vec::with_capacity(siblings.len());
        for sibling in siblings {
            if *sibling != master && !ordered.contains(sibling) {
                ordered.push(*sibling);
            }
        }
        self.groups.insert(master, ordered);
        Ok(())
    }

    /// Master of the group a product belongs to, as master or sibling.
    fn owning_master(&self, product_id: ProductId) -> Option<ProductId> {
        if self.groups.contains_key(&product_id) {
            return Some(product_id);
        }
        self.master_of(product_id)
    }

    /// Master of a sibling product.
    pub fn master_of(&self, product_id: ProductId) -> Option<ProductId> {
        self.groups
            .iter()
            .find(|(_, siblings)| siblings.contains(&product_id))
            .map(|(master, _)| *master)
    }

    pub fn siblings_of(&self, master: ProductId) -> &[ProductId] {
        self.groups.get(&master).map_or(&[], Vec::as_slice)
    }

    pub fn is_sibling(&self, product_id: ProductId) -> bool {
        self.master_of(product_id).is_some()
    }

    pub fn role(&self, product_id: ProductId) -> MergeRole {
        if let Some(siblings) = self.groups.get(&product_id) {
            return MergeRole::Master {
                siblings: siblings.clone(),
            };
        }
        match self.master_of(product_id) {
            Some(master) => MergeRole::Sibling { master },
            None => MergeRole::Standalone,
        }
    }

    /// Every product rebuilt together with `product_id`, master first.
    pub fn group_of(&self, product_id: ProductId) -> Vec<ProductId> {
        let master = self.owning_master(product_id).unwrap_or(product_id);
        std::iter::once(master)
            .chain(self.siblings_of(master).iter().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
