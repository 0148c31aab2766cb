//! Decoder-table indexing: canonical measurement names, dense per-name
//! occurrence indices, and combined column headers.

use crate::error::{IndexError, Result};
use crate::placeholder::resolve_placeholders;
use ctv_fileio::writable_path;
use ctv_table::{is_blankish, DataTable, SENTINEL, TAG_DELIMITER};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Processing mode carried over from the MTPL `Mode` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexMode {
    #[default]
    Standard,
    /// Per-iteration tag mode: the output name carries the first ITUFF
    /// token (or the config id) to keep expanded variants apart.
    CtvTag,
}

/// Result of indexing one decoder table.
#[derive(Debug, Clone)]
pub struct IndexedCtv {
    pub out_file: PathBuf,
    /// Identifier carved out of the input file name, used by the query
    /// stage to qualify its output file. Empty in CtvTag mode.
    pub csv_identifier: String,
    /// Ordered tag column names between `Index` and `Name` in the output.
    pub tag_headers: Vec<String>,
}

/// Index one raw decoder CSV.
///
/// Resolves `<Column>` placeholders in the token column against each row,
/// sorts rows by resolved token, assigns dense 0-based occurrence indices
/// per derived name, normalizes blank cells to the `&` sentinel, drops
/// uniformly empty tag columns, and writes the indexed table (with
/// `Name_Index` and `combined_string` columns) next to `place_in`.
pub fn index_ctv(
    input_file: &Path,
    test_name: &str,
    module_name: &str,
    place_in: &Path,
    mode: IndexMode,
    config_number: &str,
) -> Result<IndexedCtv> {
    let prefix = if module_name.is_empty() {
        test_name.to_string()
    } else {
        format!("{module_name}::{test_name}")
    };

    let mut indexed = process_decoder_rows(input_file, &prefix)?;
    finalize_indexed(&mut indexed);

    let out_file = output_path(&indexed, &prefix, module_name, place_in, mode, config_number);
    let out_file = writable_path(&out_file)?;
    indexed.write_csv(&out_file)?;
    log::info!("{} is indexed!", out_file.display());

    let csv_identifier = match mode {
        IndexMode::CtvTag => String::new(),
        IndexMode::Standard => csv_identifier_from(input_file),
    };
    let tag_headers = tag_headers_between_index_and_name(&indexed);
    Ok(IndexedCtv {
        out_file,
        csv_identifier,
        tag_headers,
    })
}

/// First stage: raw decoder rows to `Index`, tags..., `Name`.
fn process_decoder_rows(input_file: &Path, prefix: &str) -> Result<DataTable> {
    let raw = DataTable::read_csv_flexible(input_file)?;
    let headers = raw.headers().to_vec();

    // Tag window: everything between position 1 and the Size column.
    let size_pos = raw
        .column_index("Size")
        .unwrap_or_else(|| headers.len());
    let tag_window: Vec<usize> = (1..size_pos).collect();

    let token_idx = raw
        .column_index("ItuffToken")
        .or_else(|| raw.column_index("StorageToken"))
        .ok_or_else(|| IndexError::MissingTokenColumn(input_file.display().to_string()))?;

    let mut resolved_rows: Vec<(String, Vec<String>)> = raw
        .rows()
        .iter()
        .map(|row| {
            let token = resolve_placeholders(&row[token_idx], &headers, row);
            (token, row.clone())
        })
        .collect();
    resolved_rows.sort_by(|a, b| a.0.cmp(&b.0));

    let upper_prefix = prefix.to_uppercase();
    let is_clk = upper_prefix.contains("CLK");
    let is_mio_ddr = upper_prefix.contains("MIO_DDR");

    let mut out_headers = vec!["Index".to_string()];
    out_headers.extend(tag_window.iter().map(|&i| headers[i].clone()));
    out_headers.push("Name".to_string());
    let mut indexed = DataTable::new(out_headers);

    let mut occurrences: HashMap<String, u64> = HashMap::new();
    for (token, row) in resolved_rows {
        let empty_token = token.is_empty() || token == "-";
        if token == "-" && is_clk {
            continue;
        }
        if empty_token && is_mio_ddr {
            continue;
        }
        let name = if empty_token {
            prefix.to_string()
        } else {
            format!("{prefix}_{token}")
        };
        let index = occurrences.entry(name.clone()).or_insert(0);
        let mut out_row = vec![index.to_string()];
        out_row.extend(tag_window.iter().map(|&i| row[i].clone()));
        out_row.push(name);
        indexed
            .push_row(out_row)
            .expect("row assembled to header width");
        *index += 1;
    }
    Ok(indexed)
}

/// Second stage: `Name_Index`, sentinel normalization, empty-column pruning,
/// `combined_string` with collision disambiguation.
fn finalize_indexed(indexed: &mut DataTable) {
    let name_values = indexed
        .column_values("Name")
        .expect("Name column exists by construction");
    let index_values = indexed
        .column_values("Index")
        .expect("Index column exists by construction");
    let name_index: Vec<String> = name_values
        .iter()
        .zip(&index_values)
        .map(|(n, i)| format!("{n}_{i}"))
        .collect();
    indexed
        .add_column("Name_Index", name_index)
        .expect("one value per row");

    let name_pos = indexed.column_index("Name").expect("Name column");
    let index_pos = indexed.column_index("Index").expect("Index column");
    indexed.sort_rows_by(|row| {
        let numeric = row[index_pos].parse::<u64>().unwrap_or(u64::MAX);
        format!("{}\u{0}{numeric:010}", row[name_pos])
    });

    indexed.map_cells(|cell| is_blankish(cell).then(|| SENTINEL.to_string()));
    let tag_headers = tag_headers_between_index_and_name(indexed);
    indexed.drop_uniformly_empty_columns(&tag_headers);

    let tag_headers = tag_headers_between_index_and_name(indexed);
    let combined = build_combined_strings(indexed, &tag_headers);
    indexed
        .add_column("combined_string", combined)
        .expect("one value per row");
}

/// `---`-joined tag values per row; the `Field` column, when present, is
/// always the terminal component.
fn build_combined_strings(indexed: &DataTable, tag_headers: &[String]) -> Vec<String> {
    let mut parts_cols: Vec<usize> = Vec::new();
    for name in tag_headers {
        let idx = indexed.column_index(name).expect("tag column");
        parts_cols.push(idx);
        if name == "Field" {
            break;
        }
    }

    let mut combined: Vec<String> = indexed
        .rows()
        .iter()
        .map(|row| {
            parts_cols
                .iter()
                .map(|&i| row[i].as_str())
                .collect::<Vec<_>>()
                .join(TAG_DELIMITER)
        })
        .collect();

    // Combined strings become final column headers; a silent duplicate
    // would overwrite a column during rename, so disambiguate here.
    let mut seen: HashMap<String, u64> = HashMap::new();
    for value in combined.iter_mut() {
        let count = seen.entry(value.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            let disambiguated = format!("{value}#{count}");
            log::warn!("Duplicate combined_string {value:?}, renaming to {disambiguated:?}");
            *value = disambiguated;
        }
    }
    combined
}

fn tag_headers_between_index_and_name(table: &DataTable) -> Vec<String> {
    let (Some(index_pos), Some(name_pos)) =
        (table.column_index("Index"), table.column_index("Name"))
    else {
        return Vec::new();
    };
    table.headers()[index_pos + 1..name_pos].to_vec()
}

fn output_path(
    indexed: &DataTable,
    prefix: &str,
    module_name: &str,
    place_in: &Path,
    mode: IndexMode,
    config_number: &str,
) -> PathBuf {
    let config_part = if config_number.is_empty() {
        String::new()
    } else {
        format!("_{config_number}")
    };

    let ituff_part = match mode {
        IndexMode::Standard => String::new(),
        IndexMode::CtvTag => {
            let first_token = first_ituff_token(indexed, prefix);
            if first_token.is_empty() {
                format!("_{config_part}")
            } else {
                first_token
            }
        }
    };

    let file_name = match prefix.split_once("::") {
        Some((_, test)) => format!("{module_name}_{test}{config_part}{ituff_part}_indexed.csv"),
        None => format!("{prefix}{config_part}{ituff_part}_indexed.csv"),
    };
    place_in.join(file_name)
}

/// First Name whose token part (the remainder after the test prefix) is
/// non-empty; used to qualify CtvTag output file names.
fn first_ituff_token(indexed: &DataTable, prefix: &str) -> String {
    let Ok(names) = indexed.column_values("Name") else {
        return String::new();
    };
    for name in names {
        let trimmed = name.trim();
        if is_blankish(trimmed) {
            continue;
        }
        let stripped = trimmed.replace(prefix, "");
        let token = stripped.rsplit("::").next().unwrap_or("");
        if !token.is_empty() {
            return token.to_string();
        }
    }
    String::new()
}

/// Identifier between the last path separator and `.csv`, with the
/// `decoded` marker and underscores stripped.
fn csv_identifier_from(input_file: &Path) -> String {
    let name = input_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some(stem) = name.strip_suffix(".csv").or_else(|| {
        let end = name.find(".csv")?;
        Some(&name[..end])
    }) else {
        return String::new();
    };
    if name.contains("decoded") {
        stem.trim_matches(|c| "deco".contains(c))
            .trim_matches('_')
            .to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_decoder(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn indexes_tokens_with_dense_per_name_indices() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_decoder(
            dir.path(),
            "dec.csv",
            "Pin,Register,Domain,Size,ItuffToken\n\
             CLK0,R1,D1,4,<Pin>_RESULT\n\
             CLK0,R2,D1,4,<Pin>_RESULT\n\
             CLK1,R1,D2,4,<Pin>_RESULT\n",
        );
        let out = index_ctv(&input, "MyTest", "", dir.path(), IndexMode::Standard, "").unwrap();
        let table = DataTable::read_csv(&out.out_file).unwrap();

        let names = table.column_values("Name").unwrap();
        assert_eq!(names[0], "MyTest_CLK0_RESULT");
        assert_eq!(names[1], "MyTest_CLK0_RESULT");
        assert_eq!(names[2], "MyTest_CLK1_RESULT");
        let indices = table.column_values("Index").unwrap();
        assert_eq!(indices, vec!["0", "1", "0"]);
        let name_indices = table.column_values("Name_Index").unwrap();
        assert_eq!(name_indices[0], "MyTest_CLK0_RESULT_0");
        assert_eq!(name_indices[1], "MyTest_CLK0_RESULT_1");
        assert_eq!(out.tag_headers, vec!["Register", "Domain"]);
    }

    #[test]
    fn index_assignment_is_input_order_independent() {
        let dir = tempfile::tempdir().unwrap();
        let forward = write_decoder(
            dir.path(),
            "a.csv",
            "Pin,Tag,Size,ItuffToken\nP0,t0,1,B_TOK\nP1,t1,1,A_TOK\n",
        );
        let reversed = write_decoder(
            dir.path(),
            "b.csv",
            "Pin,Tag,Size,ItuffToken\nP1,t1,1,A_TOK\nP0,t0,1,B_TOK\n",
        );
        let out_a = index_ctv(&forward, "T", "", dir.path(), IndexMode::Standard, "").unwrap();
        let out_b = index_ctv(&reversed, "T", "", dir.path(), IndexMode::Standard, "").unwrap();
        let a = DataTable::read_csv(&out_a.out_file).unwrap();
        let b = DataTable::read_csv(&out_b.out_file).unwrap();
        assert_eq!(a.column_values("Name").unwrap(), b.column_values("Name").unwrap());
        assert_eq!(
            a.column_values("Index").unwrap(),
            b.column_values("Index").unwrap()
        );
    }

    #[test]
    fn clk_tests_skip_dash_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_decoder(
            dir.path(),
            "dec.csv",
            "Pin,Tag,Size,ItuffToken\nP0,t0,1,-\nP1,t1,1,REAL\n",
        );
        let out = index_ctv(
            &input,
            "SOMETEST",
            "CLK_PLL_BASE",
            dir.path(),
            IndexMode::Standard,
            "",
        )
        .unwrap();
        let table = DataTable::read_csv(&out.out_file).unwrap();
        assert_eq!(table.n_rows(), 1);
        assert_eq!(
            table.column_values("Name").unwrap()[0],
            "CLK_PLL_BASE::SOMETEST_REAL"
        );
    }

    #[test]
    fn empty_token_yields_bare_prefix_outside_special_families() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_decoder(
            dir.path(),
            "dec.csv",
            "Pin,Tag,Size,ItuffToken\nP0,t0,1,-\n",
        );
        let out = index_ctv(&input, "PLAIN", "", dir.path(), IndexMode::Standard, "").unwrap();
        let table = DataTable::read_csv(&out.out_file).unwrap();
        assert_eq!(table.column_values("Name").unwrap(), vec!["PLAIN"]);
    }

    #[test]
    fn blank_tags_become_sentinels_in_combined_string() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_decoder(
            dir.path(),
            "dec.csv",
            "Pin,Register,Domain,Size,ItuffToken\nP0,R1,-,1,TOK\nP1,R2,D2,1,TOK\n",
        );
        let out = index_ctv(&input, "T", "", dir.path(), IndexMode::Standard, "").unwrap();
        let table = DataTable::read_csv(&out.out_file).unwrap();
        let combined = table.column_values("combined_string").unwrap();
        assert_eq!(combined, vec!["R1---&", "R2---D2"]);
    }

    #[test]
    fn uniformly_empty_tag_columns_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_decoder(
            dir.path(),
            "dec.csv",
            "Pin,Register,Unused,Size,ItuffToken\nP0,R1,-,1,TOK_A\nP1,R2,,1,TOK_B\n",
        );
        let out = index_ctv(&input, "T", "", dir.path(), IndexMode::Standard, "").unwrap();
        assert_eq!(out.tag_headers, vec!["Register"]);
    }

    #[test]
    fn duplicate_combined_strings_are_disambiguated() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_decoder(
            dir.path(),
            "dec.csv",
            "Pin,Register,Size,ItuffToken\nP0,R1,1,TOK\nP1,R1,1,TOK\n",
        );
        let out = index_ctv(&input, "T", "", dir.path(), IndexMode::Standard, "").unwrap();
        let table = DataTable::read_csv(&out.out_file).unwrap();
        let combined = table.column_values("combined_string").unwrap();
        assert_eq!(combined, vec!["R1", "R1#2"]);
    }

    #[test]
    fn module_qualified_output_naming() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_decoder(
            dir.path(),
            "dec.csv",
            "Pin,Tag,Size,ItuffToken\nP0,t0,1,TOK\n",
        );
        let out = index_ctv(&input, "MYTEST", "MOD_A", dir.path(), IndexMode::Standard, "7")
            .unwrap();
        assert_eq!(
            out.out_file.file_name().unwrap().to_string_lossy(),
            "MOD_A_MYTEST_7_indexed.csv"
        );
    }

    #[test]
    fn decoded_marker_is_stripped_from_identifier() {
        assert_eq!(csv_identifier_from(Path::new("/a/X_3_decoded.csv")), "X_3");
        assert_eq!(csv_identifier_from(Path::new("/a/plain.csv")), "plain");
    }
}
