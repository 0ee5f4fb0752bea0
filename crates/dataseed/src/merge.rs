//! The merge executor: reconciles a dataset with what is already in the database.
//!
//! Tables are merged one at a time in dataset order, and the rows of a table one at a time in dataset order.  For
//! every row:
//!
//! 1. Build a predicate: the table's key columns if the match strategy gives it a key, otherwise every column the row
//!    mentions.  Predicates compare with `IS`, so NULL matches NULL.
//! 2. Count the database rows matching it.
//! 3. None: insert the row, with exactly the columns it mentions.  One: update the columns the row mentions which
//!    aren't part of the predicate.  More than one: fail, since there is no way to know which row was meant.
//!
//! Later rows see the effects of earlier ones, because everything goes through the one transaction the caller handed
//! us.  Nothing here commits or rolls back; on error the caller decides what happens to that transaction.  Nothing is
//! ever deleted, and tables are never created: a table missing from the target catalog fails the merge.
use log::*;
use rusqlite::Transaction;

use crate::catalog::{MetadataHandler, SqliteCatalog};
use crate::config::MergeConfig;
use crate::dataset::{Dataset, Row, Table};
use crate::error::{Error, Result};
use crate::sql::{build_table_ident, StatementCache, StatementKind};
use crate::value::Value;

/// What happened to one table.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TableReport {
    pub table: String,
    pub inserted: usize,
    pub updated: usize,
    /// Rows which matched an existing row and had nothing left to set.
    pub unchanged: usize,
}

/// What happened to every table of a dataset, in merge order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MergeReport {
    pub tables: Vec<TableReport>,
}

impl MergeReport {
    pub fn inserted(&self) -> usize {
        self.tables.iter().map(|x| x.inserted).sum()
    }

    pub fn updated(&self) -> usize {
        self.tables.iter().map(|x| x.updated).sum()
    }

    pub fn unchanged(&self) -> usize {
        self.tables.iter().map(|x| x.unchanged).sum()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum RowOutcome {
    Inserted,
    Updated,
    Unchanged,
}

pub struct MergeExecutor {
    config: MergeConfig,
    metadata: Box<dyn MetadataHandler>,
    statements: StatementCache,
}

impl MergeExecutor {
    /// An executor for SQLite, scoped to the configured catalog.
    pub fn new(config: MergeConfig) -> Result<Self> {
        let metadata = SqliteCatalog::new(config.catalog.clone())?;
        MergeExecutor::with_metadata_handler(config, Box::new(metadata))
    }

    /// An executor which answers metadata questions through `metadata`.
    ///
    /// `metadata` must be scoped to the same catalog as `config`, which is the catalog written to.
    pub fn with_metadata_handler(config: MergeConfig, metadata: Box<dyn MetadataHandler>) -> Result<Self> {
        config.validate()?;
        Ok(MergeExecutor {
            config,
            metadata,
            statements: Default::default(),
        })
    }

    pub fn get_config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merge `dataset` through `transaction`.
    ///
    /// The dataset should already have had its NULL tokens resolved.  Stops at the first error.
    pub fn merge(&mut self, transaction: &Transaction<'_>, dataset: Dataset) -> Result<MergeReport> {
        let mut report = MergeReport::default();

        for table in dataset.iter_tables() {
            let table_report = self.merge_table(transaction, table)?;
            info!(
                "Merged {} into catalog {}: {} inserted, {} updated, {} unchanged",
                table_report.table,
                self.config.catalog,
                table_report.inserted,
                table_report.updated,
                table_report.unchanged
            );
            report.tables.push(table_report);
        }

        Ok(report)
    }

    fn merge_table(&mut self, transaction: &Transaction<'_>, table: &Table) -> Result<TableReport> {
        let name = table.get_name();
        let schema = self.config.schema.as_deref();

        if !self.write_target_exists(transaction, schema, name)? {
            return Err(Error::MissingTable {
                catalog: self.config.catalog.clone(),
                table: name.to_string(),
            });
        }

        let table_ident = build_table_ident(&self.config.catalog, schema, name);
        let mut report = TableReport {
            table: name.to_string(),
            ..Default::default()
        };

        for (index, row) in table.iter_rows().enumerate() {
            match self.merge_row(transaction, &table_ident, table, index, row)? {
                RowOutcome::Inserted => report.inserted += 1,
                RowOutcome::Updated => report.updated += 1,
                RowOutcome::Unchanged => report.unchanged += 1,
            }
        }

        Ok(report)
    }

    /// Does the table we would write to exist?
    ///
    /// Without a schema, lookups match the name under any schema but writes go to the bare name, so the bare name
    /// itself has to be there.
    fn write_target_exists(&self, transaction: &Transaction<'_>, schema: Option<&str>, name: &str) -> Result<bool> {
        if !self.metadata.table_exists(transaction, schema, name)? {
            return Ok(false);
        }

        if schema.is_some() {
            return Ok(true);
        }

        let found = self.metadata.list_tables(transaction, None, &[])?;
        Ok(found.iter().any(|t| t.schema.is_none() && t.name == name))
    }

    #[cfg(test)]
    pub(crate) fn cached_statement_count(&self) -> usize {
        self.statements.len()
    }

    fn merge_row(
        &mut self,
        transaction: &Transaction<'_>,
        table_ident: &str,
        table: &Table,
        index: usize,
        row: &Row,
    ) -> Result<RowOutcome> {
        let name = table.get_name();
        let exec_error = |e: rusqlite::Error| Error::merge_execution(name, Some(index), e);

        // Split the row into the predicate and the columns to set.
        let mut predicate: Vec<(&str, &Value)> = vec![];
        let mut assignments: Vec<(&str, &Value)> = vec![];
        match self.config.match_strategy.key_columns(table.get_descriptor()) {
            Some(key) => {
                for k in key.iter() {
                    let v = row.get(k).ok_or_else(|| {
                        Error::malformed(Some(name), Some(index), format!("row has no value for key column {}", k))
                    })?;
                    predicate.push((k.as_str(), v));
                }
                assignments.extend(row.iter().filter(|(c, _)| !key.iter().any(|k| k == c)));
            }
            None => predicate.extend(row.iter()),
        }

        let predicate_columns = predicate.iter().map(|x| x.0).collect::<Vec<_>>();
        let count_sql = self
            .statements
            .get(StatementKind::Count, table_ident, &predicate_columns, &[])?;
        let matches: i64 = transaction
            .prepare_cached(count_sql)
            .and_then(|mut stmt| {
                stmt.query_row(rusqlite::params_from_iter(predicate.iter().map(|x| x.1)), |r| r.get(0))
            })
            .map_err(exec_error)?;

        match matches {
            0 => {
                let columns = row.iter().map(|x| x.0).collect::<Vec<_>>();
                let insert = self.statements.get(StatementKind::Insert, table_ident, &[], &columns)?;
                transaction
                    .prepare_cached(insert)
                    .and_then(|mut stmt| stmt.execute(rusqlite::params_from_iter(row.iter().map(|x| x.1))))
                    .map_err(exec_error)?;
                trace!("{} row {}: inserted", name, index);
                Ok(RowOutcome::Inserted)
            }
            1 if assignments.is_empty() => {
                trace!("{} row {}: already present", name, index);
                Ok(RowOutcome::Unchanged)
            }
            1 => {
                let columns = assignments.iter().map(|x| x.0).collect::<Vec<_>>();
                let update = self
                    .statements
                    .get(StatementKind::Update, table_ident, &predicate_columns, &columns)?;
                let params = assignments.iter().chain(predicate.iter()).map(|x| x.1);
                transaction
                    .prepare_cached(update)
                    .and_then(|mut stmt| stmt.execute(rusqlite::params_from_iter(params)))
                    .map_err(exec_error)?;
                trace!("{} row {}: updated", name, index);
                Ok(RowOutcome::Updated)
            }
            n => Err(Error::AmbiguousRow {
                table: name.to_string(),
                row: index,
                matches: n as usize,
            }),
        }
    }
}
