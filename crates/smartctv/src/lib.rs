//! SmartCTV expander: JSON test configurations to decoded CTV CSV files.
//!
//! A SmartCTV JSON names a decoder template CSV plus the iterator, map,
//! custom, and queue parameters that fill its placeholders. This crate
//! expands each configuration into the concrete per-token table the indexer
//! consumes.

mod config;
mod error;
mod expand;
mod process;

pub use config::{
    fix_json_trailing_commas, load_config, value_to_string, DecoderConfig, MapParameter,
    SmartCtvConfig, TestConfiguration,
};
pub use error::{Result, SmartCtvError};
pub use expand::{expand_chunk, split_break_chunks, IterValue};
pub use process::{process_smart_ctv, SmartCtvOutput};
