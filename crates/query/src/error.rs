use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueryError>;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Table error: {0}")]
    TableError(#[from] ctv_table::TableError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("No token suffix rule for test type '{0}'")]
    UnknownTestType(String),

    /// The database bridge itself could not be acquired. Unlike a
    /// per-datasource failure this aborts the whole run.
    #[error("Database bridge unavailable: {0}")]
    BridgeUnavailable(String),

    #[error("Query against {datasource} failed: {message}")]
    Database { datasource: String, message: String },
}
