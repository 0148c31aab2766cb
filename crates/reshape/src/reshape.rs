//! Wide-format reshaping of the pulled long-format data: one row per unit,
//! one column per measurement, headed by the decoder's combined strings.

use std::path::{Path, PathBuf};

use ctv_fileio::writable_path;
use ctv_table::{suffix_sort_cmp, DataTable};

use crate::error::Result;
use crate::merge::combine_pipe_fields;

/// Unit identity columns, in output order.
pub const ID_COLUMNS: [&str; 5] = ["Lot_WafXY", "LOT", "WAFER_ID", "SORT_X", "SORT_Y"];

/// Output path for the reshaped table. Any `decoded` residue from upstream
/// file naming is scrubbed out.
pub fn dataoutput_path(
    output_folder: &Path,
    test_name_file: &str,
    extra_identifier: &str,
) -> PathBuf {
    let test = test_name_file
        .split_once("::")
        .map(|(_, t)| t)
        .unwrap_or(test_name_file);
    let name = if extra_identifier.is_empty() {
        format!("{test}_dataoutput.csv")
    } else {
        format!("{extra_identifier}_{test}_dataoutput.csv")
    };
    output_folder.join(name.replace("decoded", ""))
}

fn derive_lot_wafxy(table: &mut DataTable) -> Result<()> {
    let lot = table.require_column("LOT")?;
    let wafer = table.require_column("WAFER_ID")?;
    let x = table.require_column("SORT_X")?;
    let y = table.require_column("SORT_Y")?;
    let values: Vec<String> = table
        .rows()
        .iter()
        .map(|row| format!("{}_{}_{}_{}", row[lot], row[wafer], row[x], row[y]))
        .collect();
    table.add_column("Lot_WafXY", values)?;
    Ok(())
}

fn merge_pass_fail(table: &mut DataTable) -> Result<()> {
    let pass_cols: Vec<String> = table
        .headers()
        .iter()
        .filter(|h| h.ends_with("_PASS"))
        .cloned()
        .collect();
    for pass_col in pass_cols {
        let base = pass_col
            .strip_suffix("_PASS")
            .unwrap_or(&pass_col)
            .to_string();
        let pass_idx = table.require_column(&pass_col)?;
        let fail_idx = table.column_index(&format!("{base}_FAIL"));

        let combined: Vec<String> = table
            .rows()
            .iter()
            .map(|row| {
                let fail = fail_idx.map(|i| row[i].as_str()).unwrap_or("");
                combine_pipe_fields(&row[pass_idx], fail)
            })
            .collect();

        // widest merged value decides the sub-column count
        let n_parts = combined
            .iter()
            .map(|v| v.split('|').count())
            .max()
            .unwrap_or(0);
        for part in 0..n_parts {
            let values: Vec<String> = combined
                .iter()
                .map(|v| v.split('|').nth(part).unwrap_or("").to_string())
                .collect();
            table.add_column(&format!("{base}_combined_{part}"), values)?;
        }
        table.add_column(&format!("{base}_combined"), combined)?;
    }
    Ok(())
}

/// Reshape the pulled long-format file into the wide `*_dataoutput.csv`.
///
/// The pivot writes back over the pulled file (it doubles as the data-input
/// scratch); the wide table then goes through PASS/FAIL merging, column
/// pruning and ordering, and finally header renaming against the decoder's
/// Name → combined_string pairs.
pub fn reshape_output(
    pulled_file: &Path,
    indexed_input: &Path,
    test_name_file: &str,
    extra_identifier: &str,
    output_folder: Option<&Path>,
) -> Result<PathBuf> {
    let default_dir = pulled_file.parent().unwrap_or(Path::new("."));
    let output_folder = output_folder.unwrap_or(default_dir);

    let mut pulled = DataTable::read_csv(pulled_file)?;
    derive_lot_wafxy(&mut pulled)?;

    let id_cols: Vec<String> = ID_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut table = match pulled.pivot_first(&id_cols, "TEST_NAME", "STRING_RESULT") {
        Some(pivot) => pivot,
        None => {
            log::warn!("did not pivot {}", pulled_file.display());
            pulled
        }
    };
    table.write_csv(pulled_file)?;
    let pivot_headers: Vec<String> = table.headers().to_vec();

    merge_pass_fail(&mut table)?;

    let to_drop: Vec<String> = table
        .headers()
        .iter()
        .filter(|h| h.contains("CTV") && !h.contains("combined_"))
        .cloned()
        .collect();
    table.drop_columns(&to_drop);

    let renamed: Vec<String> = table
        .headers()
        .iter()
        .map(|h| h.replace("_combined", ""))
        .collect();
    table.set_headers(renamed)?;

    if table.n_cols() > ID_COLUMNS.len() {
        let mut order: Vec<String> = table.headers()[..ID_COLUMNS.len()].to_vec();
        let mut rest: Vec<String> = table.headers()[ID_COLUMNS.len()..].to_vec();
        rest.sort_by(|a, b| suffix_sort_cmp(a, b));
        order.extend(rest);
        table.reorder_columns(&order)?;
    }

    rename_to_combined_strings(&mut table, &pivot_headers, indexed_input)?;

    let out_file = writable_path(&dataoutput_path(
        output_folder,
        test_name_file,
        extra_identifier,
    ))?;
    table.write_csv(&out_file)?;
    log::info!("{} has been completed", out_file.display());
    Ok(out_file)
}

/// Rename measurement columns to the decoder's combined strings.
///
/// Decoder rows are filtered to names present among the pivot columns
/// (compared case-insensitively, with and without `_PASS`/`_FAIL`); only an
/// exact count match applies the mapping, anything else leaves the headers
/// alone.
fn rename_to_combined_strings(
    table: &mut DataTable,
    pivot_headers: &[String],
    indexed_input: &Path,
) -> Result<()> {
    if table.n_cols() < ID_COLUMNS.len() {
        return Ok(());
    }

    let mut known: Vec<String> = pivot_headers.iter().map(|h| h.to_lowercase()).collect();
    known.extend(
        pivot_headers
            .iter()
            .map(|h| h.replace("_PASS", "").replace("_FAIL", "").to_lowercase()),
    );

    let decoder = DataTable::read_csv(indexed_input)?;
    let name_idx = decoder.require_column("Name")?;
    let combined_idx = decoder.require_column("combined_string")?;
    let combined: Vec<String> = decoder
        .rows()
        .iter()
        .filter(|row| known.contains(&row[name_idx].to_lowercase()))
        .map(|row| row[combined_idx].clone())
        .collect();

    if combined.len() == table.n_cols() - ID_COLUMNS.len() {
        log::info!("mapping decoder strings onto {} columns", combined.len());
        let mut headers: Vec<String> = table.headers()[..ID_COLUMNS.len()].to_vec();
        headers.extend(combined);
        table.set_headers(headers)?;
    } else {
        log::warn!(
            "no mapping: {} decoder rows against {} data columns",
            combined.len(),
            table.n_cols() - ID_COLUMNS.len()
        );
    }
    Ok(())
}
