//! Long-format stacking of the reshaped output for variability analysis.

use std::path::{Path, PathBuf};

use ctv_fileio::writable_path;
use ctv_table::{DataTable, TAG_DELIMITER};

use crate::error::Result;

/// Identity columns kept out of the melt, in precedence order. Only the
/// ones actually present in the input participate.
pub const STACK_ID_COLUMNS: [&str; 7] = [
    "Lot_WafXY",
    "LOT",
    "WAFER_ID",
    "SORT_X",
    "SORT_Y",
    "INTERFACE_BIN",
    "FUNCTIONAL_BIN",
];

/// Melt a wide `*_dataoutput.csv` into `*_datastacked.csv`: one row per
/// (unit, measurement), the measurement header split on `---` into tag
/// columns.
///
/// `label_names` names the tag columns; splits wider than the provided
/// names fall back to `Label<n>` continuation, and an empty slice means
/// all-default naming.
pub fn stack_file(dataoutput: &Path, label_names: &[String]) -> Result<PathBuf> {
    let stacked_name = dataoutput
        .file_name()
        .map(|n| n.to_string_lossy().replace("dataoutput", "datastacked"))
        .unwrap_or_else(|| "datastacked.csv".to_string());
    let parent = dataoutput.parent().unwrap_or(Path::new("."));
    let out_file = writable_path(&parent.join(stacked_name))?;

    let table = DataTable::read_csv(dataoutput)?;
    let id_cols: Vec<String> = STACK_ID_COLUMNS
        .iter()
        .filter(|c| table.column_index(c).is_some())
        .map(|c| c.to_string())
        .collect();
    let melted = table.melt(&id_cols, "Label", "Data")?;

    let label_idx = melted.require_column("Label")?;
    let data_idx = melted.require_column("Data")?;
    let n_parts = melted
        .rows()
        .iter()
        .map(|row| row[label_idx].split(TAG_DELIMITER).count())
        .max()
        .unwrap_or(1);

    let mut headers = id_cols.clone();
    for part in 0..n_parts {
        match label_names.get(part) {
            Some(name) => headers.push(name.clone()),
            None => headers.push(format!("Label{}", part + 1)),
        }
    }
    headers.push("Data".to_string());

    let mut stacked = DataTable::new(headers);
    for row in melted.rows() {
        let mut out_row: Vec<String> = row[..id_cols.len()].to_vec();
        let mut parts = row[label_idx].split(TAG_DELIMITER);
        for _ in 0..n_parts {
            out_row.push(parts.next().unwrap_or("").to_string());
        }
        out_row.push(row[data_idx].clone());
        stacked.push_row(out_row)?;
    }

    stacked.write_csv(&out_file)?;
    log::info!("{} has been stacked", out_file.display());
    Ok(out_file)
}
