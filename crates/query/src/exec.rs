//! Query execution: token batching across databases into the long-format
//! pull file.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use ctv_fileio::writable_path;
use ctv_table::DataTable;

use crate::bridge::UberBridge;
use crate::error::{QueryError, Result};
use crate::sql::{build_query, QuerySpec};
use crate::tokens::{split_by_byte_size, token_name_list, TokenStyle, MAX_CHUNK_BYTES};

/// Columns the pull file falls back to when no datasource had rows.
pub const IDENTITY_HEADERS: [&str; 4] = ["LOT", "WAFER_ID", "SORT_X", "SORT_Y"];

/// The long-format pull.
#[derive(Debug, Clone)]
pub struct PulledData {
    pub pulled_file: PathBuf,
    pub data_found: bool,
}

/// Output path for the pull: `<test>_datapulled.csv`, module prefix of a
/// `Module::Test` name stripped.
pub fn datapulled_path(output_folder: &Path, test_name_file: &str) -> PathBuf {
    let test = test_name_file
        .split_once("::")
        .map(|(_, t)| t)
        .unwrap_or(test_name_file);
    output_folder.join(format!("{test}_datapulled.csv"))
}

fn write_identity_stub(path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(IDENTITY_HEADERS)?;
    writer.flush()?;
    Ok(())
}

/// Pull string results for every distinct `Name` of an indexed decoder file.
///
/// Token chunks run against each configured database in turn: the first
/// chunk truncates the pull file, later chunks append. A chunk with zero
/// rows reinitializes the file to the identity stub and moves on to the
/// next database; a database whose final chunk found data ends the probe.
/// Connection problems with one datasource are logged and probing
/// continues; an unavailable bridge aborts immediately.
pub fn uber_request(
    bridge: &dyn UberBridge,
    indexed_input: &Path,
    test_name_file: &str,
    test_type: &str,
    needed_suffix: bool,
    output_folder: Option<&Path>,
    spec: &QuerySpec,
) -> Result<PulledData> {
    let default_dir = indexed_input.parent().unwrap_or(Path::new("."));
    let output_folder = output_folder.unwrap_or(default_dir);
    let pulled_file = writable_path(&datapulled_path(output_folder, test_name_file))?;

    let decoder = DataTable::read_csv(indexed_input)?;
    let mut seen = HashSet::new();
    let names: Vec<String> = decoder
        .column_values("Name")?
        .into_iter()
        .filter(|n| seen.insert(n.clone()))
        .collect();

    let style = TokenStyle::derive(test_type, needed_suffix)?;
    let tokens = token_name_list(&names, style);
    let chunks = split_by_byte_size(&tokens, MAX_CHUNK_BYTES);
    log::info!(
        "querying {} tokens in {} chunks for {}",
        tokens.len(),
        chunks.len(),
        test_name_file
    );

    let mut data_found = false;
    for database in &spec.databases {
        let mut conn = match bridge.connect(database) {
            Ok(conn) => conn,
            Err(err @ QueryError::BridgeUnavailable(_)) => return Err(err),
            Err(err) => {
                log::warn!("skipping datasource {database}: {err}");
                continue;
            }
        };

        let mut first_iteration = true;
        let mut completed_all = true;
        for chunk in &chunks {
            let sql = build_query(chunk, spec);
            let scratch = writable_path(&output_folder.join("query.txt"))?;
            std::fs::write(&scratch, &sql)?;

            let fetched = conn.execute(&sql).and_then(|mut cursor| {
                let columns = cursor.columns();
                Ok((columns, cursor.rows()?))
            });
            let (columns, rows) = match fetched {
                Ok(fetched) => fetched,
                Err(err @ QueryError::BridgeUnavailable(_)) => return Err(err),
                Err(err) => {
                    log::warn!("query against {database} failed: {err}");
                    completed_all = false;
                    break;
                }
            };

            if rows.is_empty() {
                log::warn!("no data from {database}, reinitializing pull file");
                write_identity_stub(&pulled_file)?;
                data_found = false;
                completed_all = false;
                break;
            }

            let file = if first_iteration {
                std::fs::File::create(&pulled_file)?
            } else {
                OpenOptions::new().append(true).open(&pulled_file)?
            };
            let mut writer = csv::Writer::from_writer(file);
            if first_iteration {
                writer.write_record(&columns)?;
                first_iteration = false;
            }
            for row in &rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
            data_found = true;
        }

        if completed_all && data_found {
            break;
        }
    }

    // writable_path already created the file, so probe its size
    let still_empty = pulled_file.metadata().map(|m| m.len() == 0).unwrap_or(true);
    if !data_found && still_empty {
        write_identity_stub(&pulled_file)?;
    }
    log::info!("full SQL done for {test_name_file}");
    Ok(PulledData {
        pulled_file,
        data_found,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pulled_name_strips_module_prefix() {
        let path = datapulled_path(Path::new("/out"), "CLK::MY_TEST");
        assert_eq!(path, Path::new("/out/MY_TEST_datapulled.csv"));
        let plain = datapulled_path(Path::new("/out"), "MY_TEST");
        assert_eq!(plain, Path::new("/out/MY_TEST_datapulled.csv"));
    }
}
