//! CTV decoder indexer: raw decoder tables to indexed measurement-name
//! tables with combined column headers.

mod error;
mod index;
mod placeholder;

pub use error::{IndexError, Result};
pub use index::{index_ctv, IndexMode, IndexedCtv};
pub use placeholder::resolve_placeholders;
