//! ClkUtils indexing: enumerate the setup × ratio × stage × field space of
//! every matching test case into per-die-region indexed CSV files.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use ctv_fileio::writable_path;
use ctv_table::DataTable;

use crate::config::{extract_setups, load_config, ClkUtilsConfig, TestCase};
use crate::error::Result;

/// ITUFF token-count ceiling per test name.
pub const ITUFF_LIMIT: usize = 1433;

/// Catch-all filter: process every test case.
pub const DEFAULT_FILTER: &str = "(.*)";

const HEADERS: [&str; 9] = [
    "Index",
    "DCM",
    "Ratio",
    "Test",
    "Stage",
    "Field",
    "Name",
    "Name_Index",
    "combined_string",
];

const TAG_HEADERS: [&str; 5] = ["DCM", "Ratio", "Test", "Stage", "Field"];

static FREQ_CORNER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(MIN\|MAX\|NOM\)").unwrap());
static OPTIONAL_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(?!_\((corerecovery|Profile)\)\)").unwrap());

/// Result of indexing one ClkUtils JSON.
///
/// Tag headers are only meaningful when the filter pinned a single die
/// region: the one file then feeds directly into querying.
#[derive(Debug, Clone)]
pub struct ClkUtilsIndex {
    pub out_files: Vec<PathBuf>,
    pub tag_headers: Option<Vec<String>>,
}

/// Die regions a test filter selects.
pub fn die_regions(filter: &str) -> Vec<&'static str> {
    if filter.contains("SDTBEGIN") && filter.contains("TOP") {
        vec!["cbb"]
    } else if filter.contains("BEGIN") && filter.contains("TOP") {
        vec!["top"]
    } else if filter.contains("BASE") {
        vec!["base"]
    } else {
        vec!["top", "base", "cbb"]
    }
}

/// One run of the shared emission loop: a setup list with its own capacity
/// calculation and counter. cbb `$setup` derivation produces one group per
/// cbb key; everything else is a single group.
struct EmissionGroup {
    /// (DCM name, test-name modifier) pairs.
    setups: Vec<(String, String)>,
}

fn emission_groups(
    case: &TestCase,
    region: &str,
    config: &ClkUtilsConfig,
) -> Result<Vec<EmissionGroup>> {
    if case.setup.is_setup_reference() {
        match region {
            "cbb" => {
                let mut groups = Vec::new();
                for (cbb_key, setup_nums) in extract_setups(&config.setups.setup.cbb) {
                    let mut setups = Vec::new();
                    for num in &setup_nums {
                        setups.push((config.setups.dcm_name(num)?, format!("_{cbb_key}")));
                    }
                    groups.push(EmissionGroup { setups });
                }
                Ok(groups)
            }
            "top" => {
                let mut setups = Vec::new();
                for (_, setup_nums) in extract_setups(&config.setups.setup.top) {
                    for num in &setup_nums {
                        setups.push((config.setups.dcm_name(num)?, String::new()));
                    }
                }
                Ok(vec![EmissionGroup { setups }])
            }
            // no registered setups for this region
            _ => Ok(vec![EmissionGroup { setups: Vec::new() }]),
        }
    } else {
        let crate::config::SetupSpec::List(names) = &case.setup else {
            return Ok(vec![EmissionGroup { setups: Vec::new() }]);
        };
        Ok(vec![EmissionGroup {
            setups: names
                .iter()
                .map(|n| (n.clone(), String::new()))
                .collect(),
        }])
    }
}

fn emit_group(
    table: &mut DataTable,
    group: &EmissionGroup,
    ratios: &[String],
    case: &TestCase,
    ituff: &str,
    ituff_limit: usize,
) -> Result<()> {
    let mut expected = 0usize;
    for stage in &case.ctv_sequence {
        if let Some(fields) = &stage.fields {
            expected += ratios.len() * group.setups.len() * fields.len();
        }
    }
    // exactly at the limit still fits without a suffix
    let mut suffix_num = if expected > ituff_limit { 1 } else { 0 };
    let mut ituff_mod = if expected > ituff_limit {
        format!("_{suffix_num}")
    } else {
        String::new()
    };

    let mut counter = 0usize;
    for (dcm, modifier) in &group.setups {
        for ratio in ratios {
            for stage in &case.ctv_sequence {
                let Some(fields) = &stage.fields else {
                    continue;
                };
                for field in fields {
                    let name = format!("{ituff}{modifier}{ituff_mod}");
                    let combined = format!(
                        "{dcm}---{ratio}---{}---{}---{}",
                        case.test_config_name, stage.stage, field.name
                    );
                    table.push_row(vec![
                        counter.to_string(),
                        dcm.clone(),
                        ratio.clone(),
                        case.test_config_name.clone(),
                        stage.stage.clone(),
                        field.name.clone(),
                        name.clone(),
                        format!("{name}_{counter}"),
                        combined,
                    ])?;
                    counter += 1;
                    if counter >= ituff_limit {
                        counter = 0;
                        suffix_num += 1;
                        ituff_mod = format!("_{suffix_num}");
                    }
                }
            }
        }
    }
    Ok(())
}

/// Index a ClkUtils configuration JSON into `clkutils_<region>_indexed.csv`
/// files, one per selected die region.
///
/// `filter` narrows test cases by anchored regex match and selects die
/// regions by its substrings; `filter_choice` substitutes the frequency
/// corner when the test names are derived from the case patterns.
pub fn index_clkutils(
    json_path: &Path,
    filter: Option<&str>,
    place_in: Option<&Path>,
    ituff_limit: usize,
    filter_choice: &str,
) -> Result<ClkUtilsIndex> {
    let config = load_config(json_path)?;
    let filter = filter.unwrap_or(DEFAULT_FILTER);

    let filter_tb = if filter == DEFAULT_FILTER {
        String::new()
    } else if filter.contains("::") {
        format!("_{}", filter.split("::").collect::<Vec<_>>().join("_"))
    } else {
        format!("_{filter}")
    };

    let default_dir = json_path.parent().unwrap_or(Path::new("."));
    let place_in = place_in.unwrap_or(default_dir);
    let regions = die_regions(filter);

    let mut out_files = Vec::new();
    for region in &regions {
        let out_file = place_in.join(format!("clkutils_{region}{filter_tb}_indexed.csv"));
        let out_file = writable_path(&out_file)?;

        let mut table = DataTable::new(HEADERS.iter().map(|h| h.to_string()).collect());
        for case in &config.test_cases {
            let Some(pattern) = case.regular_expression.first() else {
                continue;
            };
            let anchored = match Regex::new(&format!(r"\A(?:{pattern})")) {
                Ok(re) => re,
                Err(err) => {
                    log::warn!("skipping test case {}: bad pattern: {err}", case.test_config_name);
                    continue;
                }
            };
            if !anchored.is_match(filter) {
                continue;
            }

            let ituff = if filter != DEFAULT_FILTER {
                filter.to_string()
            } else {
                let substituted = FREQ_CORNER.replace_all(pattern, filter_choice);
                OPTIONAL_TAIL.replace_all(&substituted, "").into_owned()
            };

            let ratios = case.ratio_names();
            for group in emission_groups(case, region, &config)? {
                emit_group(&mut table, &group, &ratios, case, &ituff, ituff_limit)?;
            }
        }

        table.write_csv(&out_file)?;
        log::info!("{} is indexed", out_file.display());
        out_files.push(out_file);

        if regions.len() == 1 {
            return Ok(ClkUtilsIndex {
                out_files,
                tag_headers: Some(TAG_HEADERS.iter().map(|h| h.to_string()).collect()),
            });
        }
    }
    Ok(ClkUtilsIndex {
        out_files,
        tag_headers: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn filter_substrings_select_die_regions() {
        assert_eq!(die_regions("CLK_TOP_SDTBEGIN_X"), vec!["cbb"]);
        assert_eq!(die_regions("CLK_TOP_BEGIN_X"), vec!["top"]);
        assert_eq!(die_regions("CLK_BASE_X"), vec!["base"]);
        assert_eq!(die_regions("OTHER"), vec!["top", "base", "cbb"]);
    }

    #[test]
    fn derived_name_substitutes_frequency_corner() {
        let substituted = FREQ_CORNER.replace_all("CLK_(MIN|MAX|NOM)_TOP", "NOM");
        assert_eq!(substituted, "CLK_NOM_TOP");
    }
}
