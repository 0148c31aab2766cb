//! CSV emission for parsed MTPL records.

use crate::error::Result;
use crate::parser::{parse_flow_results, parse_test_instances};
use ctv_fileio::writable_path;
use ctv_table::DataTable;
use std::path::{Path, PathBuf};

pub const TEST_CSV_HEADERS: [&str; 6] = [
    "TestType",
    "TestName",
    "ConfigurationFile",
    "BasicTestConfiguration",
    "Mode",
    "BypassPort",
];

pub const PORT_CSV_HEADERS: [&str; 2] = ["FlowItem", "Result"];

/// Parse an MTPL file and write its test instances to
/// `<place_in>/<basename>.csv`. I/O errors opening the source propagate.
pub fn mtpl_to_csv(mtpl_path: &Path, place_in: &Path) -> Result<PathBuf> {
    let text = std::fs::read_to_string(mtpl_path)?;
    let instances = parse_test_instances(&text);

    let mut table = DataTable::new(TEST_CSV_HEADERS.iter().map(|h| h.to_string()).collect());
    for inst in &instances {
        table.push_row(vec![
            inst.decoder_type.clone(),
            inst.test_name.clone(),
            inst.configuration_file.clone(),
            inst.basic_test_config.clone().unwrap_or_default(),
            inst.mode.clone().unwrap_or_default(),
            inst.bypass_port.clone().unwrap_or_default(),
        ])?;
    }

    let out = place_in.join(format!("{}.csv", file_name(mtpl_path)));
    let out = writable_path(&out)?;
    table.write_csv(&out)?;
    log::info!(
        "Extracted {} entries from {} into {}",
        instances.len(),
        mtpl_path.display(),
        out.display()
    );
    Ok(out)
}

/// Parse an MTPL file and write its flow (item, result) pairs to
/// `<place_in>/<basename>.ports.csv`.
pub fn mtpl_ports_to_csv(mtpl_path: &Path, place_in: &Path) -> Result<PathBuf> {
    let text = std::fs::read_to_string(mtpl_path)?;
    let flows = parse_flow_results(&text);

    let mut table = DataTable::new(PORT_CSV_HEADERS.iter().map(|h| h.to_string()).collect());
    for flow in &flows {
        table.push_row(vec![
            flow.flow_item_name.clone(),
            flow.result_number.to_string(),
        ])?;
    }

    let out = place_in.join(format!("{}.ports.csv", file_name(mtpl_path)));
    let out = writable_path(&out)?;
    table.write_csv(&out)?;
    Ok(out)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
