//! Importing datasets by path.
//!
//! A path is first looked up in the importer's resource store, if it has one.  If the store doesn't know the path (or
//! there is no store), the path is read from the filesystem as-is.  The dataset is then parsed, its NULL tokens are
//! resolved, and it is merged.
use std::cell::RefCell;
use std::io::Read;

use dataseed_resource_store::ResourceStore;
use itertools::Itertools;
use log::*;
use rusqlite::Transaction;

use crate::config::MergeConfig;
use crate::database::Database;
use crate::dataset::{json, Dataset};
use crate::error::{Error, Result};
use crate::merge::{MergeExecutor, MergeReport};
use crate::null_token::NullTokenResolver;

pub struct DataImporter {
    resolver: NullTokenResolver,
    /// Shared by every import, so statements rendered for one dataset are reused by the next.
    executor: RefCell<MergeExecutor>,
    resources: Option<ResourceStore>,
}

fn resource_error(path: &str, source: std::io::Error) -> Error {
    Error::Resource {
        path: path.to_string(),
        source,
    }
}

impl DataImporter {
    pub fn new(config: MergeConfig) -> Result<Self> {
        let resolver = NullTokenResolver::from_config(&config)?;
        let executor = MergeExecutor::new(config)?;
        Ok(DataImporter {
            resolver,
            executor: RefCell::new(executor),
            resources: None,
        })
    }

    /// Look paths up in `store` before falling back to the filesystem.
    pub fn with_resource_store(mut self, store: ResourceStore) -> Self {
        self.resources = Some(store);
        self
    }

    pub fn get_config(&self) -> MergeConfig {
        self.executor.borrow().get_config().clone()
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read>> {
        if let Some(store) = self.resources.as_ref() {
            match store.open(path) {
                Ok(r) => {
                    debug!("Found {} in the resource store", path);
                    return Ok(r);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("{} isn't in the resource store; trying the filesystem", path);
                }
                // Keys like `/abs/path.json` aren't valid store keys, but are fine filesystem paths.
                Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => {
                    debug!("{} can't be a resource key ({}); trying the filesystem", path, e);
                }
                Err(e) => return Err(resource_error(path, e)),
            }
        }

        let file = std::fs::File::open(path).map_err(|e| resource_error(path, e))?;
        Ok(Box::new(file))
    }

    /// Read and parse the dataset at `path`.
    pub fn read_dataset(&self, path: &str) -> Result<Dataset> {
        let mut reader = self.open(path)?;
        let mut text = String::new();
        // Fails on anything that isn't UTF-8.
        reader
            .read_to_string(&mut text)
            .map_err(|e| resource_error(path, e))?;
        json::parse_dataset(&text)
    }

    /// Merge an in-memory dataset through `transaction`, without committing.
    pub fn import_dataset_in(&self, dataset: Dataset, transaction: &Transaction<'_>) -> Result<MergeReport> {
        let dataset = self.resolver.resolve(dataset);
        self.executor.borrow_mut().merge(transaction, dataset)
    }

    /// Merge the dataset at `path` through `transaction`, without committing.
    pub fn import_data_in(&self, path: &str, transaction: &Transaction<'_>) -> Result<MergeReport> {
        info!("Importing {}", path);
        let dataset = self.read_dataset(path)?;
        debug!(
            "{} has the following tables: {}",
            path,
            dataset.iter_tables().map(|x| x.get_name()).join(", ")
        );
        self.import_dataset_in(dataset, transaction)
    }

    /// Merge the dataset at `path` in a transaction of its own, committed only if the whole dataset merges.
    pub fn import_data(&self, path: &str, database: &mut Database) -> Result<MergeReport> {
        let transaction = database.transaction()?;
        let report = self.import_data_in(path, &transaction)?;
        transaction
            .commit()
            .map_err(|source| Error::Connection { source })?;
        info!(
            "Imported {}: {} inserted, {} updated, {} unchanged",
            path,
            report.inserted(),
            report.updated(),
            report.unchanged()
        );
        Ok(report)
    }

    /// Merge every dataset in the resource store under `prefix`, in key order, through `transaction`.
    ///
    /// Returns the key and report of each dataset.  Requires a resource store.
    pub fn import_all_in(&self, prefix: &str, transaction: &Transaction<'_>) -> Result<Vec<(String, MergeReport)>> {
        let store = self.resources.as_ref().ok_or_else(|| {
            Error::Config(format!("importing everything under {} requires a resource store", prefix))
        })?;

        let mut ret = vec![];
        for key in store.list(prefix).map_err(|e| resource_error(prefix, e))? {
            let report = self.import_data_in(&key, transaction)?;
            ret.push((key, report));
        }

        Ok(ret)
    }
}
