//! Rendering of the statements the merge runs.
//!
//! Statements are tera templates over already-quoted identifiers, with positional `?` parameters for every value.
//! Rows are sparse, so the same table produces statements of several shapes; each shape is rendered once and cached.
use std::collections::HashMap;

use log::*;

/// Quote an identifier for SQLite, doubling any embedded quotes.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build the `catalog.table` identifier, where `table` carries the schema prefix if there is one.
pub(crate) fn build_table_ident(catalog: &str, schema: Option<&str>, table: &str) -> String {
    let stored = match schema {
        Some(s) => format!("{}.{}", s, table),
        None => table.to_string(),
    };
    format!("{}.{}", quote_ident(catalog), quote_ident(&stored))
}

// The predicate uses `IS` rather than `=` so that NULLs compare equal.
const COUNT_TEMPLATE: &str = r#"
SELECT COUNT(*) FROM {{ table }}
{%- if predicate %} WHERE {% for c in predicate %}{{ c }} IS ?{% if not loop.last %} AND {% endif %}{% endfor %}{% endif %}
"#;

const INSERT_TEMPLATE: &str = r#"
INSERT INTO {{ table }}
{%- if columns %}({{ columns | join(sep=", ") }}) VALUES (
    {%- for c in columns -%}
    ?{% if not loop.last %}, {% endif -%}
    {%- endfor -%}
)
{%- else %} DEFAULT VALUES{% endif %}
"#;

const UPDATE_TEMPLATE: &str = r#"
UPDATE {{ table }} SET {% for c in columns %}{{ c }} = ?{% if not loop.last %}, {% endif %}{% endfor %}
{%- if predicate %} WHERE {% for c in predicate %}{{ c }} IS ?{% if not loop.last %} AND {% endif %}{% endfor %}{% endif %}
"#;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) enum StatementKind {
    /// Count the rows matching the predicate.  Binds the predicate values.
    Count,
    /// Insert the columns.  Binds the column values.
    Insert,
    /// Set the columns on rows matching the predicate.  Binds the column values, then the predicate values.
    Update,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct StatementShape {
    kind: StatementKind,
    table: String,
    predicate: Vec<String>,
    columns: Vec<String>,
}

#[derive(Default)]
pub(crate) struct StatementCache {
    statements: HashMap<StatementShape, String>,
}

fn render(shape: &StatementShape) -> Result<String, tera::Error> {
    let template = match shape.kind {
        StatementKind::Count => COUNT_TEMPLATE,
        StatementKind::Insert => INSERT_TEMPLATE,
        StatementKind::Update => UPDATE_TEMPLATE,
    };

    let quote_all = |cols: &[String]| cols.iter().map(|x| quote_ident(x)).collect::<Vec<_>>();
    let mut context = tera::Context::new();
    context.insert("table", &shape.table);
    context.insert("predicate", &quote_all(&shape.predicate));
    context.insert("columns", &quote_all(&shape.columns));

    let stmt = tera::Tera::one_off(template, &context, false)?;
    Ok(stmt.trim().to_string())
}

impl StatementCache {
    /// How many distinct statements have been rendered.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.statements.len()
    }

    /// Get the statement for this shape, rendering it if we haven't seen it before.
    ///
    /// `table` must already be a quoted identifier, as built by [build_table_ident].
    pub(crate) fn get(
        &mut self,
        kind: StatementKind,
        table: &str,
        predicate: &[&str],
        columns: &[&str],
    ) -> Result<&str, tera::Error> {
        use std::collections::hash_map::Entry;

        let shape = StatementShape {
            kind,
            table: table.to_string(),
            predicate: predicate.iter().map(|x| x.to_string()).collect(),
            columns: columns.iter().map(|x| x.to_string()).collect(),
        };

        match self.statements.entry(shape) {
            Entry::Occupied(o) => Ok(o.into_mut().as_str()),
            Entry::Vacant(v) => {
                let stmt = render(v.key())?;
                debug!("{:?} statement for {}: {}", kind, table, stmt);
                Ok(v.insert(stmt).as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(build_table_ident("main", None, "users"), "\"main\".\"users\"");
        assert_eq!(build_table_ident("tenant", Some("app"), "users"), "\"tenant\".\"app.users\"");
    }

    #[test]
    fn renders_statements() {
        let mut cache = StatementCache::default();
        let table = build_table_ident("main", None, "users");

        assert_eq!(
            cache.get(StatementKind::Count, &table, &["id", "name"], &[]).unwrap(),
            "SELECT COUNT(*) FROM \"main\".\"users\" WHERE \"id\" IS ? AND \"name\" IS ?"
        );
        assert_eq!(
            cache.get(StatementKind::Count, &table, &[], &[]).unwrap(),
            "SELECT COUNT(*) FROM \"main\".\"users\""
        );
        assert_eq!(
            cache.get(StatementKind::Insert, &table, &[], &["id", "name"]).unwrap(),
            "INSERT INTO \"main\".\"users\"(\"id\", \"name\") VALUES (?, ?)"
        );
        assert_eq!(
            cache.get(StatementKind::Insert, &table, &[], &[]).unwrap(),
            "INSERT INTO \"main\".\"users\" DEFAULT VALUES"
        );
        assert_eq!(
            cache.get(StatementKind::Update, &table, &["id"], &["name", "email"]).unwrap(),
            "UPDATE \"main\".\"users\" SET \"name\" = ?, \"email\" = ? WHERE \"id\" IS ?"
        );
    }
}
