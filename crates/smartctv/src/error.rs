use thiserror::Error;

pub type Result<T> = std::result::Result<T, SmartCtvError>;

#[derive(Error, Debug)]
pub enum SmartCtvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Table error: {0}")]
    TableError(#[from] ctv_table::TableError),

    #[error("Could not parse SmartCTV JSON {path}: {source}")]
    JsonError {
        path: String,
        source: serde_json::Error,
    },
}
