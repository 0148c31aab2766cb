//! Material qualifier configuration.
//!
//! A run is driven by one CSV listing the tests to process plus the
//! material filters. Only `Test` is required; every other column falls back
//! to a declared default when absent or blank.

use std::path::Path;

use anyhow::{Context, Result};
use ctv_table::{is_blankish, DataTable};

pub const DEFAULT_LOT: &str = "Not Null";
pub const DEFAULT_WAFER: &str = "Not Null";
pub const DEFAULT_PROGRAMS: [&str; 2] = ["DAB%", "DAC%"];
pub const DEFAULT_PREFETCH: u32 = 3;
pub const DEFAULT_DATABASES: [&str; 2] = ["D1D_PROD_XEUS", "F24_PROD_XEUS"];

#[derive(Debug, Clone)]
pub struct MaterialConfig {
    pub tests: Vec<String>,
    /// One MTPL per program, paired by position.
    pub mtpls: Vec<String>,
    pub lots: Vec<String>,
    pub wafers: Vec<String>,
    pub programs: Vec<String>,
    pub prefetch: u32,
    pub databases: Vec<String>,
}

fn column_or_default(table: &DataTable, name: &str, default: &[&str]) -> Vec<String> {
    let values: Vec<String> = match table.column_index(name) {
        Some(idx) => table
            .rows()
            .iter()
            .map(|row| row[idx].clone())
            .filter(|v| !is_blankish(v))
            .collect(),
        None => Vec::new(),
    };
    if values.is_empty() {
        default.iter().map(|d| d.to_string()).collect()
    } else {
        values
    }
}

/// Load and normalize a material CSV.
pub fn load_material(path: &Path) -> Result<MaterialConfig> {
    let table = DataTable::read_csv(path)
        .with_context(|| format!("could not read material file {}", path.display()))?;
    let test_idx = table
        .column_index("Test")
        .with_context(|| format!("material file {} has no Test column", path.display()))?;

    let tests: Vec<String> = table
        .rows()
        .iter()
        .map(|row| row[test_idx].clone())
        .filter(|t| !is_blankish(t))
        .collect();

    let mtpls = match table.column_index("MTPL") {
        Some(idx) => table
            .rows()
            .iter()
            .map(|row| row[idx].clone())
            .filter(|m| !is_blankish(m))
            .collect(),
        None => Vec::new(),
    };

    let prefetch = table
        .column_index("Prefetch")
        .and_then(|idx| table.rows().first().map(|row| row[idx].clone()))
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_PREFETCH);

    Ok(MaterialConfig {
        tests,
        mtpls,
        lots: column_or_default(&table, "Lot", &[DEFAULT_LOT]),
        wafers: column_or_default(&table, "Wafer", &[DEFAULT_WAFER]),
        programs: column_or_default(&table, "Program", &DEFAULT_PROGRAMS),
        prefetch,
        databases: column_or_default(&table, "Database", &DEFAULT_DATABASES),
    })
}

impl MaterialConfig {
    /// (program, mtpl) pairs for the run. A single MTPL covers every
    /// program; none at all pairs each program with an empty path, which
    /// limits the run to the ClkUtils path.
    pub fn program_runs(&self) -> Vec<(String, String)> {
        self.programs
            .iter()
            .enumerate()
            .map(|(i, program)| {
                let mtpl = if self.mtpls.is_empty() {
                    String::new()
                } else {
                    self.mtpls[i % self.mtpls.len()].clone()
                };
                (program.clone(), mtpl)
            })
            .collect()
    }
}
