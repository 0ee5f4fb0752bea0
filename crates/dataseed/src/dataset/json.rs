//! Reading datasets from JSON.
//!
//! A dataset document is an array of table blocks, merged in document order:
//!
//! ```json
//! [
//!     { "table": "users", "columns": ["id", "name"], "key": ["id"],
//!       "rows": [{ "id": 1, "name": "[NULL]" }, { "id": 2 }] }
//! ]
//! ```
//!
//! `columns` and `key` are optional.  Without `columns`, the columns are sensed from the rows.
use std::io::Read;

use serde::Deserialize;

use crate::dataset::{Dataset, DatasetBuilder};
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TableBlock {
    table: String,
    #[serde(default)]
    columns: Option<Vec<String>>,
    #[serde(default)]
    key: Vec<String>,
    rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

fn build(blocks: Vec<TableBlock>) -> Result<Dataset> {
    let mut builder = DatasetBuilder::new();

    for block in blocks {
        let TableBlock {
            table,
            columns,
            key,
            rows,
        } = block;
        let name = table.clone();

        builder.add_table(table, |tb| {
            for c in columns.into_iter().flatten() {
                tb.add_column(c)?;
            }
            tb.set_key(key)?;

            for (index, row) in rows.into_iter().enumerate() {
                let values = row
                    .into_iter()
                    .map(|(column, v)| {
                        Value::from_json(&v)
                            .map(|v| (column.clone(), v))
                            .map_err(|reason| {
                                Error::malformed(Some(name.as_str()), Some(index), format!("column {}: {}", column, reason))
                            })
                    })
                    .collect::<Result<Vec<_>>>()?;
                tb.add_row(values)?;
            }

            Ok(())
        })?;
    }

    builder.build()
}

/// Parse a dataset document.
pub fn parse_dataset(text: &str) -> Result<Dataset> {
    let blocks: Vec<TableBlock> =
        serde_json::from_str(text).map_err(|e| Error::malformed(None, None, e.to_string()))?;
    build(blocks)
}

/// Read a dataset document, which must be UTF-8.
pub fn read_dataset(reader: impl Read) -> Result<Dataset> {
    let blocks: Vec<TableBlock> =
        serde_json::from_reader(reader).map_err(|e| Error::malformed(None, None, e.to_string()))?;
    build(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn parses_the_documented_shape() {
        let ds = parse_dataset(
            r#"[
                { "table": "users", "columns": ["id", "name", "email"], "key": ["id"],
                  "rows": [{ "id": 1, "name": "[NULL]" }, { "email": "b@example.com", "id": "2" }] },
                { "table": "posts", "rows": [] }
            ]"#,
        )
        .unwrap();

        assert_eq!(
            ds.iter_tables().map(|x| x.get_name()).collect::<Vec<_>>(),
            vec!["users", "posts"]
        );

        let users = ds.get_table("users").unwrap();
        assert_eq!(
            users.get_descriptor().iter_columns().collect::<Vec<_>>(),
            vec!["id", "name", "email"]
        );
        assert_eq!(users.get_descriptor().get_key(), &["id".to_string()]);

        let rows = users.iter_rows().collect::<Vec<_>>();
        assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
        assert_eq!(rows[0].get("name"), Some(&Value::String("[NULL]".into())));
        // Key order within the row object is kept.
        assert_eq!(rows[1].iter().map(|x| x.0).collect::<Vec<_>>(), vec!["email", "id"]);
        assert_eq!(ds.get_table("posts").unwrap().row_count(), 0);
    }

    #[test]
    fn senses_columns_without_a_header() {
        let ds = parse_dataset(r#"[{ "table": "t", "rows": [{ "a": 1 }, { "b": 2.5, "a": null }] }]"#).unwrap();
        let t = ds.get_table("t").unwrap();
        assert_eq!(t.get_descriptor().iter_columns().collect::<Vec<_>>(), vec!["a", "b"]);
        let rows = t.iter_rows().collect::<Vec<_>>();
        assert_eq!(rows[1].get("a"), Some(&Value::Null));
        assert_eq!(rows[1].get("b"), Some(&Value::F64(2.5)));
    }

    #[test]
    fn reports_where_things_went_wrong() {
        let err = parse_dataset(r#"[{ "table": "t", "rows": [{ "a": 1 }, { "a": true }] }]"#).unwrap_err();
        match err {
            Error::MalformedDataset { table, row, reason } => {
                assert_eq!(table.as_deref(), Some("t"));
                assert_eq!(row, Some(1));
                assert!(reason.contains("column a"), "{}", reason);
            }
            e => panic!("Unexpected error {:?}", e),
        }

        let err = parse_dataset(r#"[{ "table": "t", "columns": ["a"], "rows": [{ "b": 1 }] }]"#).unwrap_err();
        assert!(matches!(err, Error::MalformedDataset { row: Some(0), .. }));
    }

    #[test]
    fn rejects_structural_problems() {
        for doc in [
            "{}",
            "not json",
            r#"[{ "rows": [] }]"#,
            r#"[{ "table": "t" }]"#,
            r#"[{ "table": "t", "rows": [], "extra": 1 }]"#,
            r#"[{ "table": "t", "rows": [] }, { "table": "t", "rows": [] }]"#,
            r#"[{ "table": "t", "rows": [[1, 2]] }]"#,
        ] {
            assert!(
                matches!(parse_dataset(doc), Err(Error::MalformedDataset { .. })),
                "{} should be rejected",
                doc
            );
        }
    }

    #[test]
    fn reads_from_a_reader() {
        let doc = br#"[{ "table": "t", "rows": [{ "a": "x" }] }]"#;
        let ds = read_dataset(&doc[..]).unwrap();
        assert_eq!(ds.table_count(), 1);
    }
}
