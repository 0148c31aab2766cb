use thiserror::Error;

pub type Result<T> = std::result::Result<T, FileIoError>;

#[derive(Error, Debug)]
pub enum FileIoError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Table error: {0}")]
    TableError(#[from] ctv_table::TableError),

    #[error("Unsupported input file type: {0}")]
    UnsupportedExtension(String),

    #[error("Column name required for CSV test lists")]
    MissingColumnName,
}
