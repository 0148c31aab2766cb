use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Table error: {0}")]
    TableError(#[from] ctv_table::TableError),

    #[error("Decoder table {0} has neither ItuffToken nor StorageToken column")]
    MissingTokenColumn(String),
}
