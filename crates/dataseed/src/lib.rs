//! The dataseed crate.
//!
//! This crate merges seed data into a live SQLite database.  A dataset names tables and gives sparse rows for them;
//! merging inserts the rows which are missing, updates the ones which are present, and leaves every other row in the
//! database alone.  There are 4 pieces:
//!
//! - The [Dataset], the in-memory tables and rows, built with [DatasetBuilder] or read from JSON by [dataset::json].
//! - The [NullTokenResolver], which turns the NULL sentinel (`[NULL]` by default) into real NULLs.
//! - The [MetadataHandler], which answers "does this table exist" against exactly one catalog (for SQLite, one
//!   attached database) rather than whatever the connection happens to see first.
//! - The [MergeExecutor], which does the merging, table by table and row by row, through a transaction it borrows.
//!
//! [DataImporter] strings these together for the common case of importing a dataset by path, and [Database] opens
//! connections set up the way merging expects.
//!
//! Nothing here retries, reorders tables, creates tables, or deletes rows.  The caller owns the transaction, and with
//! it the decision to commit or roll back.
mod catalog;
mod config;
mod database;
pub mod dataset;
mod error;
mod importer;
mod merge;
mod null_token;
mod sql;
mod value;

pub use catalog::*;
pub use config::*;
pub use database::*;
pub use dataset::{Dataset, DatasetBuilder, Row, Table, TableBuilder, TableDescriptor};
pub use error::*;
pub use importer::*;
pub use merge::*;
pub use null_token::*;
pub use value::*;
