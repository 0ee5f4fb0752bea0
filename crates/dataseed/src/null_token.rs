//! Replacement of the NULL sentinel.
//!
//! Text formats have no way to say NULL, so datasets spell it with a sentinel literal, `[NULL]` unless configured
//! otherwise.  Before merging, every value exactly equal to the sentinel becomes a real [Value::Null].  The comparison
//! is exact and case-sensitive, and the sentinel is never replaced inside a longer string.
use crate::config::MergeConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::value::Value;

pub const DEFAULT_NULL_TOKEN: &str = "[NULL]";

#[derive(Clone, Debug)]
pub struct NullTokenResolver {
    token: String,
}

impl Default for NullTokenResolver {
    fn default() -> Self {
        NullTokenResolver {
            token: DEFAULT_NULL_TOKEN.to_string(),
        }
    }
}

impl NullTokenResolver {
    /// A resolver for the configured NULL token.  Fails if the configuration doesn't validate.
    pub fn from_config(config: &MergeConfig) -> Result<Self> {
        config.validate()?;
        Ok(NullTokenResolver {
            token: config.null_token.clone(),
        })
    }

    pub fn get_token(&self) -> &str {
        &self.token
    }

    fn resolve_value(&self, value: &mut Value) {
        if value.as_str() == Some(self.token.as_str()) {
            *value = Value::Null;
        }
    }

    /// Replace every sentinel in the dataset with NULL.
    pub fn resolve(&self, mut dataset: Dataset) -> Dataset {
        let mut replaced = 0usize;

        for table in dataset.tables_mut() {
            for row in table.rows_mut() {
                for value in row.values_mut() {
                    let was_null = value.is_null();
                    self.resolve_value(value);
                    if !was_null && value.is_null() {
                        replaced += 1;
                    }
                }
            }
        }

        log::debug!("Replaced {} occurrences of {} with NULL", replaced, self.token);
        dataset
    }
}
