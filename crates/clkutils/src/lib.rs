//! ClkUtils indexer: DCM test-case JSON to indexed measurement-name tables.

mod config;
mod error;
mod index;

pub use config::{
    extract_setups, load_config, ClkUtilsConfig, CtvStage, SetupRegions, SetupSpec, Setups,
    StageField, TestCase,
};
pub use error::{ClkUtilsError, Result};
pub use index::{die_regions, index_clkutils, ClkUtilsIndex, DEFAULT_FILTER, ITUFF_LIMIT};
