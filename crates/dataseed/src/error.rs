/// Everything that can stop a merge.
///
/// All errors are terminal for the invocation which produced them: nothing here is retried.  Database-facing variants
/// carry the table, and where it applies the 0-based index of the row within its table, plus the underlying cause.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Malformed dataset at {}: {reason}", location(.table, .row))]
    MalformedDataset {
        table: Option<String>,
        row: Option<usize>,
        reason: String,
    },

    #[error("Metadata query against catalog {catalog} failed: {source}")]
    MetadataQuery {
        catalog: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Table {table} does not exist in catalog {catalog}")]
    MissingTable { catalog: String, table: String },

    #[error("Row {row} of table {table} matches {matches} existing rows; refusing to guess which to update")]
    AmbiguousRow {
        table: String,
        row: usize,
        matches: usize,
    },

    #[error("Merging table {table}{}: {source}", row_suffix(.row))]
    MergeExecution {
        table: String,
        row: Option<usize>,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Unable to read resource {path}: {source}")]
    Resource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to render SQL: {0}")]
    StatementRendering(#[from] tera::Error),

    #[error("Database connection error: {source}")]
    Connection {
        #[source]
        source: rusqlite::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" row {}", r)).unwrap_or_default()
}

fn location(table: &Option<String>, row: &Option<usize>) -> String {
    match (table, row) {
        (Some(t), Some(r)) => format!("table {} row {}", t, r),
        (Some(t), None) => format!("table {}", t),
        (None, Some(r)) => format!("row {}", r),
        (None, None) => "top level".to_string(),
    }
}

impl Error {
    pub(crate) fn malformed(table: Option<&str>, row: Option<usize>, reason: impl Into<String>) -> Error {
        Error::MalformedDataset {
            table: table.map(|x| x.to_string()),
            row,
            reason: reason.into(),
        }
    }

    pub(crate) fn merge_execution(table: &str, row: Option<usize>, source: rusqlite::Error) -> Error {
        Error::MergeExecution {
            table: table.to_string(),
            row,
            source,
        }
    }
}
