use thiserror::Error;

pub type Result<T> = std::result::Result<T, MtplError>;

#[derive(Error, Debug)]
pub enum MtplError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Table error: {0}")]
    TableError(#[from] ctv_table::TableError),
}
