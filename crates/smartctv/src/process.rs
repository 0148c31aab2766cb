//! SmartCTV driver: walks the configurations of one JSON file, expands each
//! referenced decoder template, and writes the `*_decoded.csv` outputs.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use ctv_fileio::{normalize_input_path, writable_path};
use ctv_indexer::resolve_placeholders;
use ctv_table::DataTable;

use crate::config::{load_config, TestConfiguration};
use crate::error::Result;
use crate::expand::{expand_chunk, split_break_chunks};

static NON_ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z]").unwrap());

/// One expanded decoder template.
#[derive(Debug, Clone)]
pub struct SmartCtvOutput {
    pub out_file: PathBuf,
    pub ituff_suffix: String,
    pub config_id: String,
}

fn clean_headers(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|h| NON_ALPHA.replace_all(h, "").into_owned())
        .collect()
}

/// Build the output file name the decoded CSV lands under.
///
/// With an ituff postfix the suffix both prefixes the file name and extends
/// the stem; without one the config id extends the stem instead.
fn output_path(place_in: &Path, template: &Path, suffix: &str, config_id: &str) -> PathBuf {
    let basename = template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = if suffix.is_empty() {
        basename
    } else {
        format!("{suffix}{basename}")
    };
    let mut parts: Vec<String> = file_name.split('.').map(str::to_string).collect();
    let stem_pos = parts.len().saturating_sub(2);
    if suffix.is_empty() {
        parts[stem_pos] = format!("{}_{config_id}_decoded", parts[stem_pos]);
    } else {
        parts[stem_pos] = format!("{}{suffix}_decoded", parts[stem_pos]);
    }
    place_in.join(parts.join("."))
}

/// Expand every configuration of a SmartCTV JSON file (or just
/// `config_filter` when given) into decoded CSV files under `place_in`.
///
/// Per-configuration problems (missing path, file out of scope, absent
/// template) are logged skips; only an unreadable JSON file is fatal.
/// Existing non-empty outputs are reused without re-expanding.
pub fn process_smart_ctv(
    base_dir: &Path,
    json_path: &Path,
    config_filter: Option<&str>,
    place_in: &Path,
) -> Result<Vec<SmartCtvOutput>> {
    log::info!("loading SmartCTV JSON {}", json_path.display());
    let config = load_config(json_path)?;

    let mut outputs = Vec::new();
    for (config_id, raw) in &config.test_configurations {
        if let Some(wanted) = config_filter {
            if config_id != wanted {
                continue;
            }
        }

        let test_config: TestConfiguration = match serde_json::from_value(raw.clone()) {
            Ok(tc) => tc,
            Err(err) => {
                log::warn!("skipping config {config_id}: malformed decoder block: {err}");
                continue;
            }
        };
        let decoder = &test_config.decoder;

        let raw_path = decoder.configuration_file.trim_matches('"').to_string();
        if raw_path.is_empty() {
            log::warn!("skipping config {config_id}: empty ConfigurationFile");
            continue;
        }
        let Some(pos) = raw_path.find("Module") else {
            log::warn!("skipping config {config_id}: file out of scope: {raw_path}");
            continue;
        };
        let template = base_dir.join(normalize_input_path(&raw_path[pos..]));
        if !template.exists() {
            log::warn!(
                "skipping config {config_id}: template not found: {}",
                template.display()
            );
            continue;
        }

        let raw_table = DataTable::read_csv_flexible(&template)?;
        let headers = clean_headers(raw_table.headers());
        let suffix = decoder.ituff_test_name_postfix.clone().unwrap_or_default();

        let out_file = output_path(place_in, &template, &suffix, config_id);
        if out_file
            .metadata()
            .map(|m| m.len() > 0)
            .unwrap_or(false)
        {
            log::info!("reusing existing decoded file {}", out_file.display());
            outputs.push(SmartCtvOutput {
                out_file,
                ituff_suffix: suffix,
                config_id: config_id.clone(),
            });
            continue;
        }
        let out_file = writable_path(&out_file)?;

        log::info!("expanding template {}", template.display());
        let mut decoded = DataTable::new(headers.clone());
        for chunk in split_break_chunks(raw_table.rows()) {
            let filled = expand_chunk(
                &chunk,
                &headers,
                &decoder.iterators,
                &decoder.map_parameters,
                &decoder.custom_parameters,
                &decoder.queue_parameters,
            );
            for mut row in filled {
                row.resize(headers.len(), String::new());
                decoded.push_row(row)?;
            }
        }

        decoded.dedup_rows();
        // cross-column pass: placeholders that name another column of the
        // same row only become resolvable after expansion
        for row_idx in 0..decoded.n_rows() {
            let snapshot = decoded.rows()[row_idx].clone();
            for col_idx in 0..decoded.n_cols() {
                let resolved =
                    resolve_placeholders(&snapshot[col_idx], decoded.headers(), &snapshot);
                if resolved != snapshot[col_idx] {
                    decoded.set_cell(row_idx, col_idx, resolved);
                }
            }
        }
        decoded.retain_rows(|row| !row.iter().any(|c| c.to_lowercase().contains("break")));

        decoded.write_csv(&out_file)?;
        log::info!(
            "{} is decoded ({} rows)",
            out_file.display(),
            decoded.n_rows()
        );
        outputs.push(SmartCtvOutput {
            out_file,
            ituff_suffix: suffix,
            config_id: config_id.clone(),
        });
    }
    Ok(outputs)
}
