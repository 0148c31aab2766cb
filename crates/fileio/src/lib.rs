//! Path and I/O utilities: the leaf crate every pipeline stage leans on.

mod error;
mod input_list;
mod paths;
mod writable;

pub use error::{FileIoError, Result};
pub use input_list::tests_from_file;
pub use paths::{
    module_name_from_path, normalize_input_path, path_from_modules, unused_numbered_path,
};
pub use writable::{delete_files, writable_path};
