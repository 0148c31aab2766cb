use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReshapeError>;

#[derive(Error, Debug)]
pub enum ReshapeError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Table error: {0}")]
    TableError(#[from] ctv_table::TableError),
}
