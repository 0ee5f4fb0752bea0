//! The in-memory dataset.
//!
//! A dataset is an ordered list of tables.  Each table has a descriptor (its name, its columns, and optionally the
//! columns which identify a row) and an ordered list of sparse rows: a row may leave out any column, in which case
//! the database's default applies on insert and the existing value is kept on update.
//!
//! Table order is load-bearing.  Tables are merged in exactly the order they were added, so that rows referenced by
//! foreign keys can be written before the rows referencing them.
//!
//! Datasets are built with [DatasetBuilder], which is also where every structural check lives; once built, a dataset
//! is always well-formed.
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::value::Value;

pub mod json;

/// Name, columns, and optional identifying columns of a table.
#[derive(Clone, Debug, PartialEq)]
pub struct TableDescriptor {
    name: String,
    columns: Vec<String>,
    key: Vec<String>,
}

impl TableDescriptor {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn iter_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|x| x.as_str())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|x| x == column)
    }

    /// The columns declared as identifying a row.  Empty if the dataset didn't declare any.
    pub fn get_key(&self) -> &[String] {
        &self.key[..]
    }
}

#[derive(Clone, Debug, PartialEq)]
struct RowEntry {
    column: String,
    value: Value,
}

/// One row of a table: the columns it mentions, in the order it mentions them.
///
/// Most seed rows are narrow, so this is a `SmallVec` map rather than a hashmap.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    entries: SmallVec<[RowEntry; 16]>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|x| x.column == column)
            .map(|x| &x.value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// Iterate over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|x| (x.column.as_str(), &x.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.entries.iter_mut().map(|x| &mut x.value)
    }
}

/// A table of the dataset: its descriptor and its rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    descriptor: TableDescriptor,
    rows: Vec<Row>,
}

impl Table {
    pub fn get_descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    pub fn get_name(&self) -> &str {
        self.descriptor.get_name()
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut Row> {
        self.rows.iter_mut()
    }
}

/// An ordered list of tables to merge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    tables: Vec<Table>,
}

impl Dataset {
    /// Iterate over the tables in merge order.
    pub fn iter_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|x| x.get_name() == name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub(crate) fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.iter_mut()
    }
}

/// A helper to build datasets.
#[derive(Default)]
pub struct DatasetBuilder {
    tables: Vec<Table>,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a table, which the closure fills in.  Table names must be unique within the dataset.
    pub fn add_table(
        &mut self,
        name: String,
        callback: impl FnOnce(&mut TableBuilder) -> Result<()>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(Error::malformed(None, None, "table names may not be empty"));
        }

        if self.tables.iter().any(|x| x.get_name() == name) {
            return Err(Error::malformed(
                Some(name.as_str()),
                None,
                "table appears more than once in the dataset",
            ));
        }

        let mut builder = TableBuilder::new(name);
        callback(&mut builder)?;
        self.tables.push(builder.build()?);
        Ok(())
    }

    pub fn build(self) -> Result<Dataset> {
        Ok(Dataset {
            tables: self.tables,
        })
    }
}

/// A helper to build tables.
///
/// If no columns are declared with [TableBuilder::add_column], the columns are sensed from the rows instead: the union
/// of every column any row mentions, in order of first appearance.  Otherwise, rows may only use declared columns.
pub struct TableBuilder {
    name: String,
    columns: Vec<String>,
    declared: bool,
    key: Vec<String>,
    rows: Vec<Row>,
}

impl TableBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            columns: vec![],
            declared: false,
            key: vec![],
            rows: vec![],
        }
    }

    fn malformed(&self, row: Option<usize>, reason: impl Into<String>) -> Error {
        Error::malformed(Some(self.name.as_str()), row, reason)
    }

    /// Declare a column.  Must happen before any rows are added.
    pub fn add_column(&mut self, name: String) -> Result<()> {
        if !self.rows.is_empty() {
            return Err(self.malformed(None, "columns must be declared before rows are added"));
        }

        if name.is_empty() {
            return Err(self.malformed(None, "column names may not be empty"));
        }

        if self.columns.contains(&name) {
            return Err(self.malformed(None, format!("duplicate column {}", name)));
        }

        self.declared = true;
        self.columns.push(name);
        Ok(())
    }

    /// Set the columns which identify a row of this table.  Checked against the final column list at build time.
    pub fn set_key(&mut self, key: Vec<String>) -> Result<()> {
        for (i, k) in key.iter().enumerate() {
            if key[..i].contains(k) {
                return Err(self.malformed(None, format!("key column {} listed twice", k)));
            }
        }

        self.key = key;
        Ok(())
    }

    pub fn add_row<C: Into<String>, V: Into<Value>>(
        &mut self,
        values: impl IntoIterator<Item = (C, V)>,
    ) -> Result<()> {
        let index = self.rows.len();
        let mut row = Row::default();

        for (column, value) in values {
            let column = column.into();

            if column.is_empty() {
                return Err(self.malformed(Some(index), "column names may not be empty"));
            }

            if row.contains(&column) {
                return Err(self.malformed(Some(index), format!("column {} given twice", column)));
            }

            if !self.columns.contains(&column) {
                if self.declared {
                    return Err(self.malformed(
                        Some(index),
                        format!("column {} isn't one of the table's declared columns", column),
                    ));
                }
                self.columns.push(column.clone());
            }

            row.entries.push(RowEntry {
                column,
                value: value.into(),
            });
        }

        self.rows.push(row);
        Ok(())
    }

    pub fn build(self) -> Result<Table> {
        if let Some(k) = self.key.iter().find(|k| !self.columns.contains(k)) {
            return Err(self.malformed(None, format!("key column {} isn't a column of the table", k)));
        }

        Ok(Table {
            descriptor: TableDescriptor {
                name: self.name,
                columns: self.columns,
                key: self.key,
            },
            rows: self.rows,
        })
    }
}
