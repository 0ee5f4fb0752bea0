//! Catalog-scoped table metadata.
//!
//! Left to itself, a connection resolves an unqualified table name against every catalog it can see.  In SQLite terms
//! that means `main`, then `temp`, then every attached database in attachment order, so a `users` table in some other
//! attached database answers for a `users` table that doesn't exist in ours.  A [MetadataHandler] answers metadata
//! questions against exactly one catalog and nothing else.
//!
//! Schemas are table name prefixes: the table `users` in schema `app` is stored as `app.users`.  A schema of `None`
//! is a wildcard, matching the bare name or the name under any schema.
use log::*;

use crate::error::{Error, Result};
use crate::sql::quote_ident;

/// Kinds of table a listing can be filtered to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TableType {
    Table,
    View,
}

impl TableType {
    fn from_sqlite(kind: &str) -> Option<TableType> {
        match kind {
            "table" => Some(TableType::Table),
            "view" => Some(TableType::View),
            _ => None,
        }
    }
}

/// A table found by [MetadataHandler::list_tables].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableInfo {
    pub catalog: String,
    pub schema: Option<String>,
    pub name: String,
    pub table_type: TableType,
}

/// Metadata lookups scoped to one catalog, implemented once per database backend.
pub trait MetadataHandler {
    /// Does a table or view named `table` exist in this handler's catalog, under `schema`?
    fn table_exists(&self, conn: &rusqlite::Connection, schema: Option<&str>, table: &str) -> Result<bool>;

    /// List everything in this handler's catalog under `schema` whose type is one of `table_types`.
    ///
    /// An empty `table_types` lists every type.  There is no name filter; callers narrow the result themselves.
    fn list_tables(
        &self,
        conn: &rusqlite::Connection,
        schema: Option<&str>,
        table_types: &[TableType],
    ) -> Result<Vec<TableInfo>>;
}

/// The SQLite backend: a catalog is the alias of an attached database (`main`, `temp`, or an `ATTACH ... AS` name).
#[derive(Clone, Debug)]
pub struct SqliteCatalog {
    catalog: String,
}

/// Split a stored table name into its schema prefix and bare name.
fn split_stored_name(stored: &str) -> (Option<&str>, &str) {
    match stored.split_once('.') {
        Some((schema, name)) => (Some(schema), name),
        None => (None, stored),
    }
}

fn schema_matches(wanted: Option<&str>, found: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(w) => found == Some(w),
    }
}

impl SqliteCatalog {
    pub fn new(catalog: String) -> Result<Self> {
        crate::config::validate_identifier("catalog", &catalog)?;
        Ok(SqliteCatalog { catalog })
    }

    pub fn get_catalog(&self) -> &str {
        &self.catalog
    }

    fn query_error(&self, source: rusqlite::Error) -> Error {
        Error::MetadataQuery {
            catalog: self.catalog.clone(),
            source,
        }
    }

    /// `sqlite_master` of our catalog and only our catalog.
    fn master_table(&self) -> String {
        format!("{}.sqlite_master", quote_ident(&self.catalog))
    }
}

impl MetadataHandler for SqliteCatalog {
    fn table_exists(&self, conn: &rusqlite::Connection, schema: Option<&str>, table: &str) -> Result<bool> {
        let (sql, param) = match schema {
            Some(s) => (
                format!(
                    "SELECT 1 FROM {} WHERE type IN ('table', 'view') AND name = ?1",
                    self.master_table()
                ),
                format!("{}.{}", s, table),
            ),
            None => (
                format!(
                    "SELECT 1 FROM {} WHERE type IN ('table', 'view') \
                     AND (name = ?1 OR (instr(name, '.') > 0 AND substr(name, instr(name, '.') + 1) = ?1))",
                    self.master_table()
                ),
                table.to_string(),
            ),
        };

        // The statement, and with it the cursor, is finalized when it drops, on every path out of here.
        let mut stmt = conn.prepare(&sql).map_err(|e| self.query_error(e))?;
        let exists = stmt
            .exists(rusqlite::params![param])
            .map_err(|e| self.query_error(e))?;
        trace!(
            "table_exists(catalog={}, schema={:?}, table={}) = {}",
            self.catalog,
            schema,
            table,
            exists
        );
        Ok(exists)
    }

    fn list_tables(
        &self,
        conn: &rusqlite::Connection,
        schema: Option<&str>,
        table_types: &[TableType],
    ) -> Result<Vec<TableInfo>> {
        let sql = format!(
            "SELECT name, type FROM {} WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             ORDER BY name",
            self.master_table()
        );

        let mut stmt = conn.prepare(&sql).map_err(|e| self.query_error(e))?;
        let found = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))
            .map_err(|e| self.query_error(e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| self.query_error(e))?;

        let mut ret = vec![];
        for (stored, kind) in found.iter() {
            let table_type = match TableType::from_sqlite(kind) {
                Some(t) => t,
                None => continue,
            };

            if !table_types.is_empty() && !table_types.contains(&table_type) {
                continue;
            }

            let (found_schema, name) = split_stored_name(stored);
            if !schema_matches(schema, found_schema) {
                continue;
            }

            ret.push(TableInfo {
                catalog: self.catalog.clone(),
                schema: found_schema.map(|x| x.to_string()),
                name: name.to_string(),
                table_type,
            });
        }

        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    /// Main has `users`, `app.accounts` and a view; catalog `other` has its own `users` and `audit`.
    fn build_test_connection() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            ATTACH DATABASE ':memory:' AS other;
            CREATE TABLE main.users(id INTEGER PRIMARY KEY, name TEXT);
            CREATE TABLE main."app.accounts"(id INTEGER PRIMARY KEY);
            CREATE VIEW main.user_names AS SELECT name FROM users;
            CREATE TABLE other.users(id INTEGER PRIMARY KEY);
            CREATE TABLE other.audit(id INTEGER PRIMARY KEY AUTOINCREMENT, what TEXT);
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn exists_is_scoped_to_the_catalog() {
        let conn = build_test_connection();
        let main = SqliteCatalog::new("main".into()).unwrap();
        let other = SqliteCatalog::new("other".into()).unwrap();

        assert!(main.table_exists(&conn, None, "users").unwrap());
        assert!(other.table_exists(&conn, None, "users").unwrap());
        assert!(other.table_exists(&conn, None, "audit").unwrap());
        assert!(!main.table_exists(&conn, None, "audit").unwrap());
        assert!(!other.table_exists(&conn, None, "accounts").unwrap());
    }

    #[test]
    fn exists_respects_schemas() {
        let conn = build_test_connection();
        let main = SqliteCatalog::new("main".into()).unwrap();

        assert!(main.table_exists(&conn, Some("app"), "accounts").unwrap());
        assert!(main.table_exists(&conn, None, "accounts").unwrap());
        assert!(!main.table_exists(&conn, Some("app"), "users").unwrap());
        assert!(!main.table_exists(&conn, Some("nope"), "accounts").unwrap());
        assert!(main.table_exists(&conn, None, "user_names").unwrap());
    }

    #[test]
    fn lists_only_our_catalog() {
        let conn = build_test_connection();
        let main = SqliteCatalog::new("main".into()).unwrap();

        let names = |tables: Vec<TableInfo>| {
            tables
                .into_iter()
                .map(|x| (x.schema, x.name, x.table_type))
                .collect::<Vec<_>>()
        };

        assert_eq!(
            names(main.list_tables(&conn, None, &[]).unwrap()),
            vec![
                (Some("app".to_string()), "accounts".to_string(), TableType::Table),
                (None, "user_names".to_string(), TableType::View),
                (None, "users".to_string(), TableType::Table),
            ]
        );
        assert_eq!(
            names(main.list_tables(&conn, None, &[TableType::View]).unwrap()),
            vec![(None, "user_names".to_string(), TableType::View)]
        );
        assert_eq!(
            names(main.list_tables(&conn, Some("app"), &[TableType::Table]).unwrap()),
            vec![(Some("app".to_string()), "accounts".to_string(), TableType::Table)]
        );

        // sqlite_sequence exists because of the AUTOINCREMENT, but is internal.
        let other = SqliteCatalog::new("other".into()).unwrap();
        let listed = other.list_tables(&conn, None, &[TableType::Table]).unwrap();
        assert_eq!(
            listed.iter().map(|x| x.name.as_str()).collect::<Vec<_>>(),
            vec!["audit", "users"]
        );
        assert!(listed.iter().all(|x| x.catalog == "other"));
    }

    #[test]
    fn unknown_catalogs_are_errors() {
        let conn = build_test_connection();
        let missing = SqliteCatalog::new("missing".into()).unwrap();
        assert!(matches!(
            missing.table_exists(&conn, None, "users"),
            Err(Error::MetadataQuery { .. })
        ));
        assert!(matches!(
            missing.list_tables(&conn, None, &[]),
            Err(Error::MetadataQuery { .. })
        ));
    }

    #[test]
    fn rejects_bad_catalog_names() {
        assert!(SqliteCatalog::new("bad name".into()).is_err());
    }
}
