//! Surrogate key sequences.
//!
//! A sequence is seeded once per product run from the highest key in the
//! store and then only moves forward by committed row counts. It is never
//! re-read from the store mid-run: two batches prepared before either
//! commits would otherwise draw the same keys.

use std::ops::Range;

use csge_model::Table;
use csge_store::RelationalStore;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSequence {
    table: Table,
    next: i64,
}

impl IdSequence {
    /// Start after the highest key currently stored in `table`.
    pub fn seed(store: &dyn RelationalStore, table: Table) -> Result<Self> {
        let next = store.max_id(table)?.map_or(1, |max| max + 1);
        Ok(Self::starting_at(table, next))
    }

    pub fn starting_at(table: Table, next: i64) -> Self {
        Self { table, next }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    pub fn peek(&self) -> i64 {
        self.next
    }

    /// Keys for `count` rows, without consuming them.
    pub fn reserve(&self, count: usize) -> Range<i64> {
        self.next..self.next + count as i64
    }

    /// Consume `count` keys once their rows are committed.
    pub fn advance(&mut self, count: usize) {
        self.next += count as i64;
    }
}
