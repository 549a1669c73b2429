use std::collections::HashSet;

use polars::prelude::DataFrame;

use csge_model::Table;

use crate::error::Result;
use crate::frames::TableSet;
use crate::store::{InsertOutcome, RelationalStore};

/// Store keeping every table in memory. Used for dry runs and tests.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: TableSet,
}

impl MemoryStore {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tables: TableSet::new()?,
        })
    }

    /// Copy every table of another store.
    pub fn snapshot_of(store: &dyn RelationalStore) -> Result<Self> {
        let mut frames = std::collections::HashMap::new();
        for table in Table::ALL {
            frames.insert(table, store.table(table)?);
        }
        Ok(Self {
            tables: TableSet::from_frames(frames)?,
        })
    }
}

impl RelationalStore for MemoryStore {
    fn insert(&mut self, table: Table, rows: &DataFrame) -> Result<InsertOutcome> {
        self.tables.insert(table, rows)
    }

    fn delete_ids(&mut self, table: Table, column: &str, ids: &HashSet<i64>) -> Result<usize> {
        self.tables.delete_ids(table, column, ids)
    }

    fn table(&self, table: Table) -> Result<DataFrame> {
        self.tables.get(table)
    }
}
