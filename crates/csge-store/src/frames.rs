//! Tables held as Polars frames, shared by the in-memory and directory stores.

use std::collections::{HashMap, HashSet};

use polars::prelude::{BooleanChunked, Column, DataFrame, DataType, IntoColumn, NewChunkedArray, Series};

use csge_common::opt_i64_values;
use csge_model::{ColumnKind, Table};

use crate::error::{Result, StoreError};
use crate::store::InsertOutcome;

pub(crate) fn dtype(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Int => DataType::Int64,
        ColumnKind::Float => DataType::Float64,
        ColumnKind::Text => DataType::String,
    }
}

/// Zero-row frame with the table's schema.
pub fn empty_frame(table: Table) -> Result<DataFrame> {
    let columns: Vec<Column> = table
        .columns()
        .iter()
        .map(|(name, kind)| Series::new_empty((*name).into(), &dtype(*kind)).into_column())
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Reorder and cast `rows` to the table's schema.
pub fn conform(table: Table, rows: &DataFrame) -> Result<DataFrame> {
    let expected = table.column_names();
    if let Some(extra) = rows
        .get_column_names()
        .into_iter()
        .find(|name| !expected.contains(&name.as_str()))
    {
        return Err(StoreError::SchemaMismatch {
            table,
            reason: format!("unexpected column {extra}"),
        });
    }
    let mut columns = Vec::with_capacity(expected.len());
    for (name, kind) in table.columns() {
        let column = rows
            .column(name)
            .map_err(|_| StoreError::SchemaMismatch {
                table,
                reason: format!("missing column {name}"),
            })?;
        columns.push(column.cast(&dtype(*kind))?);
    }
    Ok(DataFrame::new(columns)?)
}

/// Rows validated against a table's schema and keys, ready to append.
pub(crate) struct PreparedInsert {
    table: Table,
    requested: usize,
    /// Rows in schema order and types.
    pub(crate) rows: DataFrame,
    keys: Vec<i64>,
}

/// All tables plus an index of the surrogate keys in use.
#[derive(Debug, Clone)]
pub(crate) struct TableSet {
    frames: HashMap<Table, DataFrame>,
    keys: HashMap<Table, HashSet<i64>>,
}

impl TableSet {
    pub(crate) fn new() -> Result<Self> {
        let mut frames = HashMap::new();
        for table in Table::ALL {
            frames.insert(table, empty_frame(table)?);
        }
        Self::from_frames(frames)
    }

    pub(crate) fn from_frames(frames: HashMap<Table, DataFrame>) -> Result<Self> {
        let mut keys = HashMap::new();
        for (table, frame) in &frames {
            if let Some(column) = table.id_column() {
                let ids: HashSet<i64> = opt_i64_values(frame, column)?
                    .into_iter()
                    .flatten()
                    .collect();
                keys.insert(*table, ids);
            }
        }
        Ok(Self { frames, keys })
    }

    pub(crate) fn get(&self, table: Table) -> Result<DataFrame> {
        match self.frames.get(&table) {
            Some(frame) => Ok(frame.clone()),
            None => empty_frame(table),
        }
    }

    /// Validate rows for insertion without touching the tables.
    ///
    /// Returns `None` for an empty frame.
    pub(crate) fn prepare(&self, table: Table, rows: &DataFrame) -> Result<Option<PreparedInsert>> {
        if rows.height() == 0 {
            return Ok(None);
        }
        let conformed = conform(table, rows)?;

        let mut keys = Vec::new();
        if let Some(column) = table.id_column() {
            let existing = self.keys.get(&table);
            let mut batch = HashSet::with_capacity(conformed.height());
            for id in opt_i64_values(&conformed, column)? {
                let Some(id) = id else {
                    return Err(StoreError::SchemaMismatch {
                        table,
                        reason: format!("null {column}"),
                    });
                };
                if !batch.insert(id) || existing.is_some_and(|known| known.contains(&id)) {
                    return Err(StoreError::DuplicateKey { table, id });
                }
                keys.push(id);
            }
        }
        Ok(Some(PreparedInsert {
            table,
            requested: rows.height(),
            rows: conformed,
            keys,
        }))
    }

    /// Append prepared rows.
    pub(crate) fn commit(&mut self, prepared: PreparedInsert) -> Result<InsertOutcome> {
        let PreparedInsert {
            table,
            rows,
            keys,
            requested,
        } = prepared;
        let before = self.frames.get(&table).map_or(0, DataFrame::height);
        match self.frames.get_mut(&table) {
            Some(frame) => {
                frame.vstack_mut(&rows)?;
            }
            None => {
                self.frames.insert(table, rows);
            }
        }
        let written = self.frames.get(&table).map_or(0, DataFrame::height) - before;
        if written == 0 {
            return Err(StoreError::NothingWritten {
                table,
                rows: requested,
            });
        }
        if !keys.is_empty() {
            self.keys.entry(table).or_default().extend(keys);
        }
        Ok(InsertOutcome::Written(written))
    }

    pub(crate) fn insert(&mut self, table: Table, rows: &DataFrame) -> Result<InsertOutcome> {
        match self.prepare(table, rows)? {
            Some(prepared) => self.commit(prepared),
            None => Ok(InsertOutcome::NotAttempted),
        }
    }

    pub(crate) fn delete_ids(
        &mut self,
        table: Table,
        column: &str,
        ids: &HashSet<i64>,
    ) -> Result<usize> {
        let Some(frame) = self.frames.get(&table) else {
            return Ok(0);
        };
        if ids.is_empty() || frame.height() == 0 {
            return Ok(0);
        }
        let values = opt_i64_values(frame, column)?;
        let keep: Vec<bool> = values
            .iter()
            .map(|v| !v.is_some_and(|id| ids.contains(&id)))
            .collect();
        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            return Ok(0);
        }
        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        let filtered = frame.filter(&mask)?;
        if let Some(key_column) = table.id_column() {
            let dropped: Vec<i64> = opt_i64_values(frame, key_column)?
                .into_iter()
                .zip(&keep)
                .filter_map(|(id, kept)| if *kept { None } else { id })
                .collect();
            if let Some(keys) = self.keys.get_mut(&table) {
                for id in dropped {
                    keys.remove(&id);
                }
            }
        }
        self.frames.insert(table, filtered);
        Ok(removed)
    }
}
