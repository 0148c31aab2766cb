//! Flow-port verification against decoder exit ports.
//!
//! Ancillary capability: cross-checks the result ports declared in an MTPL's
//! flow blocks against the `ExitPort` column of each CTV test's configuration
//! CSV, reporting ports the flow expects but the configuration never exits.

use crate::csv_out::{mtpl_ports_to_csv, mtpl_to_csv};
use crate::error::Result;
use ctv_fileio::{normalize_input_path, writable_path};
use ctv_table::DataTable;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMismatch {
    pub test_name: String,
    pub ports_in_flow_not_in_config: Vec<String>,
    pub missing_config: Option<String>,
    pub bypass_port: String,
}

/// Parse an MTPL, resolve each CTV test's configuration CSV under
/// `base_dir`, and report flow result ports with no matching exit port.
/// Writes `<basename>.mismatches.csv` when anything mismatches.
pub fn mtpl_verification(
    mtpl_path: &Path,
    base_dir: &Path,
    place_in: &Path,
) -> Result<Option<PathBuf>> {
    let test_csv = mtpl_to_csv(mtpl_path, place_in)?;
    let port_csv = mtpl_ports_to_csv(mtpl_path, place_in)?;
    let mismatches = find_port_mismatches(&test_csv, &port_csv, base_dir)?;
    if mismatches.is_empty() {
        log::info!("No port mismatches found in {}", mtpl_path.display());
        return Ok(None);
    }

    let mut table = DataTable::new(vec![
        "Test Instance".to_string(),
        "Missing Ports".to_string(),
        "Missing Config".to_string(),
        "Bypass Port".to_string(),
    ]);
    for m in &mismatches {
        table.push_row(vec![
            m.test_name.clone(),
            m.ports_in_flow_not_in_config.join(", "),
            m.missing_config.clone().unwrap_or_default(),
            m.bypass_port.clone(),
        ])?;
    }
    let out = place_in.join(format!(
        "{}.mismatches.csv",
        mtpl_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));
    let out = writable_path(&out)?;
    table.write_csv(&out)?;
    log::info!(
        "Found {} test instances with missing ports, saved to {}",
        mismatches.len(),
        out.display()
    );
    Ok(Some(out))
}

/// Compare flow result ports with configuration exit ports, per test.
pub fn find_port_mismatches(
    test_csv: &Path,
    port_csv: &Path,
    base_dir: &Path,
) -> Result<Vec<PortMismatch>> {
    let tests = DataTable::read_csv(test_csv)?;
    let ports = DataTable::read_csv(port_csv)?;

    let mut flow_ports: HashMap<String, BTreeSet<String>> = HashMap::new();
    let item_idx = ports.require_column("FlowItem")?;
    let result_idx = ports.require_column("Result")?;
    for row in ports.rows() {
        flow_ports
            .entry(row[item_idx].clone())
            .or_default()
            .insert(row[result_idx].clone());
    }

    let type_idx = tests.require_column("TestType")?;
    let name_idx = tests.require_column("TestName")?;
    let config_idx = tests.require_column("ConfigurationFile")?;
    let bypass_idx = tests.require_column("BypassPort")?;

    let mut mismatches = Vec::new();
    for row in tests.rows() {
        if !row[type_idx].to_lowercase().contains("ctv") {
            continue;
        }
        let test_name = &row[name_idx];
        let Some(expected) = flow_ports.get(test_name) else {
            continue;
        };
        let bypass_port = row[bypass_idx]
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();

        let relative = extract_relative_path(&row[config_idx]);
        if !relative.to_lowercase().ends_with(".csv") {
            continue;
        }
        let config_path = base_dir.join(normalize_input_path(&relative));
        if !config_path.exists() {
            mismatches.push(PortMismatch {
                test_name: test_name.clone(),
                ports_in_flow_not_in_config: expected.iter().cloned().collect(),
                missing_config: Some(config_path.display().to_string()),
                bypass_port,
            });
            continue;
        }

        let exit_ports = config_exit_ports(&config_path)?;
        let missing: Vec<String> = expected
            .iter()
            .filter(|p| !exit_ports.contains(*p) && **p != bypass_port)
            .cloned()
            .collect();
        if !missing.is_empty() {
            mismatches.push(PortMismatch {
                test_name: test_name.clone(),
                ports_in_flow_not_in_config: missing,
                missing_config: None,
                bypass_port,
            });
        }
    }
    Ok(mismatches)
}

/// Exit ports declared by a configuration CSV: integer-valued cells of its
/// `ExitPort` column. Dashes and blanks are ignored.
fn config_exit_ports(config_path: &Path) -> Result<BTreeSet<String>> {
    let table = DataTable::read_csv_flexible(config_path)?;
    let Some(idx) = table.column_index("ExitPort") else {
        log::warn!("No ExitPort column in {}", config_path.display());
        return Ok(BTreeSet::new());
    };
    Ok(table
        .rows()
        .iter()
        .filter_map(|row| row[idx].trim().parse::<i64>().ok())
        .map(|v| v.to_string())
        .collect())
}

/// Resolve a configuration-file expression to its relative path part.
///
/// MTPL config expressions come in three shapes: a quoted direct path, a
/// `"base" + "relative"` concatenation, and a
/// `GetEnvironmentVariable(...)+"relative"` form.
fn extract_relative_path(expression: &str) -> String {
    let cleaned = if let Some((_, tail)) = expression.split_once(" + ") {
        tail.to_string()
    } else if let Some((_, tail)) = expression.split_once("+\"") {
        format!("\"{tail}")
    } else {
        expression.to_string()
    };
    cleaned
        .trim()
        .trim_matches('"')
        .replace("./", "")
        .replace("\\\\", "\\")
}
