//! Directory-backed store: one CSV file per table.
//!
//! Inserts append to the table's file; deletes rewrite it through a
//! temporary file and rename. Each call therefore commits on its own, the
//! same way each table write commits independently in the database.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use polars::prelude::{Column, DataFrame};
use tracing::{debug, info, warn};

use csge_common::{
    f64_column, format_numeric, opt_f64_values, opt_i64_column, opt_i64_values, parse_f64,
    parse_i64, str_column, string_values,
};
use csge_model::{ColumnKind, Table};

use crate::error::{Result, StoreError};
use crate::frames::{TableSet, empty_frame};
use crate::store::{InsertOutcome, RelationalStore};

pub struct FrameStore {
    dir: PathBuf,
    tables: TableSet,
}

impl FrameStore {
    /// Open a store directory, creating it when missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut frames = HashMap::new();
        for table in Table::ALL {
            let path = table_path(&dir, table);
            let frame = if path.is_file() {
                read_table(&path, table)?
            } else {
                if table.is_reference() {
                    warn!(%table, path = %path.display(), "Reference table missing; every lookup will fail");
                }
                empty_frame(table)?
            };
            debug!(%table, rows = frame.height(), "Loaded table");
            frames.insert(table, frame);
        }
        info!(dir = %dir.display(), "Opened store");
        Ok(Self {
            dir,
            tables: TableSet::from_frames(frames)?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RelationalStore for FrameStore {
    fn insert(&mut self, table: Table, rows: &DataFrame) -> Result<InsertOutcome> {
        let Some(prepared) = self.tables.prepare(table, rows)? else {
            return Ok(InsertOutcome::NotAttempted);
        };
        // A rejected batch never reaches the file, and a failed append never
        // reaches the in-memory copy.
        append_rows(&table_path(&self.dir, table), table, &prepared.rows)?;
        self.tables.commit(prepared)
    }

    fn delete_ids(&mut self, table: Table, column: &str, ids: &HashSet<i64>) -> Result<usize> {
        let removed = self.tables.delete_ids(table, column, ids)?;
        if removed > 0 {
            let frame = self.tables.get(table)?;
            rewrite_table(&table_path(&self.dir, table), table, &frame)?;
        }
        Ok(removed)
    }

    fn table(&self, table: Table) -> Result<DataFrame> {
        self.tables.get(table)
    }
}

fn table_path(dir: &Path, table: Table) -> PathBuf {
    dir.join(format!("{}.csv", table.name()))
}

fn read_table(path: &Path, table: Table) -> Result<DataFrame> {
    let csv_err = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut indices = Vec::with_capacity(table.columns().len());
    for (name, _) in table.columns() {
        let index = headers
            .iter()
            .position(|h| h == *name)
            .ok_or_else(|| StoreError::SchemaMismatch {
                table,
                reason: format!("{} lacks column {name}", path.display()),
            })?;
        indices.push(index);
    }

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); indices.len()];
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        for (buffer, index) in raw.iter_mut().zip(&indices) {
            buffer.push(record.get(*index).unwrap_or_default().to_string());
        }
    }

    let mut columns: Vec<Column> = Vec::with_capacity(raw.len());
    for ((name, kind), values) in table.columns().iter().zip(raw) {
        let invalid = |value: &str| StoreError::InvalidValue {
            path: path.to_path_buf(),
            column: (*name).to_string(),
            value: value.to_string(),
        };
        let column = match kind {
            ColumnKind::Text => str_column(name, values),
            ColumnKind::Int => {
                let mut parsed = Vec::with_capacity(values.len());
                for value in &values {
                    if value.trim().is_empty() {
                        parsed.push(None);
                    } else {
                        parsed.push(Some(parse_i64(value).ok_or_else(|| invalid(value))?));
                    }
                }
                opt_i64_column(name, parsed)
            }
            ColumnKind::Float => {
                let mut parsed = Vec::with_capacity(values.len());
                for value in &values {
                    if value.trim().is_empty() {
                        parsed.push(None);
                    } else {
                        parsed.push(Some(parse_f64(value).ok_or_else(|| invalid(value))?));
                    }
                }
                f64_column(name, parsed)
            }
        };
        columns.push(column);
    }
    Ok(DataFrame::new(columns)?)
}

/// Render every cell as CSV text, column by column.
fn render(table: Table, frame: &DataFrame) -> Result<Vec<Vec<String>>> {
    let mut rendered = Vec::with_capacity(table.columns().len());
    for (name, kind) in table.columns() {
        let column = match kind {
            ColumnKind::Text => string_values(frame, name)?,
            ColumnKind::Int => opt_i64_values(frame, name)?
                .into_iter()
                .map(|v| v.map(|v| v.to_string()).unwrap_or_default())
                .collect(),
            ColumnKind::Float => opt_f64_values(frame, name)?
                .into_iter()
                .map(|v| v.map(format_numeric).unwrap_or_default())
                .collect(),
        };
        rendered.push(column);
    }
    Ok(rendered)
}

fn write_rows<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    path: &Path,
    table: Table,
    frame: &DataFrame,
    with_header: bool,
) -> Result<()> {
    let csv_err = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };
    if with_header {
        writer
            .write_record(table.column_names())
            .map_err(csv_err)?;
    }
    let rendered = render(table, frame)?;
    for row in 0..frame.height() {
        writer
            .write_record(rendered.iter().map(|column| column[row].as_str()))
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn append_rows(path: &Path, table: Table, frame: &DataFrame) -> Result<()> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let needs_header = fs::metadata(path).map_or(true, |m| m.len() == 0);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    write_rows(&mut writer, path, table, frame, needs_header)
}

fn rewrite_table(path: &Path, table: Table, frame: &DataFrame) -> Result<()> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let temp = path.with_extension("csv.tmp");
    {
        let file = File::create(&temp).map_err(io_err)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        write_rows(&mut writer, &temp, table, frame, true)?;
    }
    fs::rename(&temp, path).map_err(io_err)
}
