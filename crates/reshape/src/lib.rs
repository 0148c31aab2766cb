//! Reshaper and stacker: pulled long-format data to analysis-ready tables.

mod error;
mod merge;
mod reshape;
mod stack;

pub use error::{ReshapeError, Result};
pub use merge::combine_pipe_fields;
pub use reshape::{dataoutput_path, reshape_output, ID_COLUMNS};
pub use stack::{stack_file, STACK_ID_COLUMNS};
