//! String-typed tabular core for the CTV pipeline.
//!
//! Every stage of the pipeline is a file-to-file transformation over CSV
//! tables; this crate provides the one table value type and the pure
//! operations (pivot, melt, column pruning, sentinel normalization) the
//! stages share.

mod error;
mod sentinel;
mod table;

pub use error::{Result, TableError};
pub use sentinel::{
    is_blankish, is_empty_or_sentinel, suffix_sort_cmp, suffix_sort_key, SENTINEL, TAG_DELIMITER,
};
pub use table::DataTable;
