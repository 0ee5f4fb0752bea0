//! Merge configuration.
//!
//! Everything has a default, so an empty JSON object is a valid configuration: merge into the `main` catalog, with
//! unqualified table names, `[NULL]` as the NULL token, matching rows on the key each table declares (or on every
//! column a row mentions, for tables which declare none).
use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dataset::TableDescriptor;
use crate::error::{Error, Result};
use crate::null_token::DEFAULT_NULL_TOKEN;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("Identifier regex should compile");
}

/// How the merge decides whether a dataset row already exists in the database.
///
/// Key precedence under [MatchStrategy::DeclaredKey], the default: a key configured in `keys`, then the key the
/// dataset declares for the table, then every column the row mentions.  [MatchStrategy::AllColumns] ignores keys
/// entirely.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum MatchStrategy {
    /// A row exists if some database row has the same value in every column the dataset row mentions, even when the
    /// table declares a key.
    AllColumns,

    /// A row exists if some database row has the same value in the table's key columns.
    DeclaredKey {
        #[serde(default)]
        keys: BTreeMap<String, Vec<String>>,
    },
}

impl Default for MatchStrategy {
    fn default() -> Self {
        MatchStrategy::DeclaredKey {
            keys: Default::default(),
        }
    }
}

impl MatchStrategy {
    /// The key columns to match `table` on, or `None` to match on every column a row mentions.
    pub fn key_columns<'a>(&'a self, table: &'a TableDescriptor) -> Option<&'a [String]> {
        match self {
            MatchStrategy::AllColumns => None,
            MatchStrategy::DeclaredKey { keys } => keys
                .get(table.get_name())
                .map(|x| &x[..])
                .or_else(|| Some(table.get_key()))
                .filter(|x| !x.is_empty()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// The catalog every metadata lookup and every write is scoped to.
    pub catalog: String,

    /// Schema prefix of the target tables, if any.
    pub schema: Option<String>,

    pub null_token: String,

    pub match_strategy: MatchStrategy,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            catalog: "main".into(),
            schema: None,
            null_token: DEFAULT_NULL_TOKEN.into(),
            match_strategy: Default::default(),
        }
    }
}

/// Check that `name` can be used as a catalog or schema name.
pub(crate) fn validate_identifier(what: &str, name: &str) -> Result<()> {
    if !IDENTIFIER.is_match(name) {
        return Err(Error::Config(format!(
            "{} {:?} must be letters, digits, and underscores, not starting with a digit",
            what, name
        )));
    }

    Ok(())
}

impl MergeConfig {
    pub fn validate(&self) -> Result<()> {
        validate_identifier("catalog", &self.catalog)?;
        if let Some(s) = self.schema.as_deref() {
            validate_identifier("schema", s)?;
        }

        if self.null_token.is_empty() {
            return Err(Error::Config("the NULL token may not be empty".into()));
        }

        if let MatchStrategy::DeclaredKey { keys } = &self.match_strategy {
            if let Some((t, _)) = keys.iter().find(|(_, k)| k.is_empty()) {
                return Err(Error::Config(format!("key for table {} may not be empty", t)));
            }
        }

        Ok(())
    }

    /// Parse and validate a configuration from JSON.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: MergeConfig = serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_reader(reader: impl std::io::Read) -> Result<Self> {
        let config: MergeConfig = serde_json::from_reader(reader).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    use crate::dataset::DatasetBuilder;

    #[test]
    fn empty_config_is_the_default() {
        assert_eq!(MergeConfig::from_json_str("{}").unwrap(), MergeConfig::default());
    }

    #[test]
    fn parses_everything() {
        let config = MergeConfig::from_json_str(
            r#"{
                "catalog": "tenant_a",
                "schema": "app",
                "null_token": "<null>",
                "match_strategy": { "strategy": "declared_key", "keys": { "users": ["id"] } }
            }"#,
        )
        .unwrap();

        let mut keys = BTreeMap::new();
        keys.insert("users".to_string(), vec!["id".to_string()]);
        assert_eq!(
            config,
            MergeConfig {
                catalog: "tenant_a".into(),
                schema: Some("app".into()),
                null_token: "<null>".into(),
                match_strategy: MatchStrategy::DeclaredKey { keys },
            }
        );

        let config = MergeConfig::from_json_str(r#"{ "match_strategy": { "strategy": "all_columns" } }"#).unwrap();
        assert_eq!(config.match_strategy, MatchStrategy::AllColumns);
    }

    #[test]
    fn rejects_bad_values() {
        for doc in [
            r#"{ "catalog": "has space" }"#,
            r#"{ "catalog": "" }"#,
            r#"{ "schema": "a.b" }"#,
            r#"{ "null_token": "" }"#,
            r#"{ "unknown": 1 }"#,
            r#"{ "match_strategy": { "strategy": "primary_key" } }"#,
            r#"{ "match_strategy": { "strategy": "declared_key", "keys": { "t": [] } } }"#,
        ] {
            assert!(
                matches!(MergeConfig::from_json_str(doc), Err(Error::Config(_))),
                "{} should be rejected",
                doc
            );
        }
    }

    #[test]
    fn key_resolution_order() {
        let mut b = DatasetBuilder::new();
        b.add_table("declared".into(), |tb| {
            tb.set_key(vec!["id".into()])?;
            tb.add_row([("id", 1i64), ("code", 2i64)])
        })
        .unwrap();
        b.add_table("bare".into(), |tb| tb.add_row([("id", 1i64)])).unwrap();
        let ds = b.build().unwrap();
        let declared = ds.get_table("declared").unwrap().get_descriptor();
        let bare = ds.get_table("bare").unwrap().get_descriptor();

        assert_eq!(MatchStrategy::AllColumns.key_columns(declared), None);

        // The default honors the dataset's key.
        assert_eq!(
            MatchStrategy::default().key_columns(declared),
            Some(&["id".to_string()][..])
        );
        assert_eq!(MatchStrategy::default().key_columns(bare), None);

        let strategy = MatchStrategy::DeclaredKey { keys: BTreeMap::new() };
        assert_eq!(strategy.key_columns(declared), Some(&["id".to_string()][..]));
        assert_eq!(strategy.key_columns(bare), None);

        let mut keys = BTreeMap::new();
        keys.insert("declared".to_string(), vec!["code".to_string()]);
        let strategy = MatchStrategy::DeclaredKey { keys };
        assert_eq!(strategy.key_columns(declared), Some(&["code".to_string()][..]));
    }
}
