use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClkUtilsError>;

#[derive(Error, Debug)]
pub enum ClkUtilsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Table error: {0}")]
    TableError(#[from] ctv_table::TableError),

    #[error("Could not parse ClkUtils JSON {path}: {source}")]
    JsonError {
        path: String,
        source: serde_json::Error,
    },

    #[error("Unknown setup number {0} in setup_map")]
    UnknownSetup(String),
}
