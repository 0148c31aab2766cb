use std::path::Path;

use ctv_clkutils::index_clkutils;
use ctv_table::DataTable;
use pretty_assertions::assert_eq;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let json = serde_json::json!({
        "setups": {
            "setup": {
                "top": { "clk.dcm.main": "1, 2" },
                "cbb": { "clk.dcm.east": "1", "clk.dcm.west": "2" }
            },
            "setup_map": { "1": "DCM0", "2": "DCM1" }
        },
        "ClkUtils_test_case_config": [
            {
                "regular_expression": ["CLK_TOP_.*"],
                "test_config_name": "freq_sweep",
                "setup": "$setup",
                "ratios": "8, 12",
                "ctv_sequence": [
                    { "stage": "S1", "fields": [{ "name": "F1" }, { "name": "F2" }] },
                    { "stage": "NOFIELDS" }
                ]
            }
        ]
    });
    let path = dir.join("clkutils_config.json");
    std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();
    path
}

#[test]
fn top_filter_produces_single_region_file_with_tag_headers() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = write_config(dir.path());

    let index = index_clkutils(
        &json_path,
        Some("CLK_TOP_BEGIN_X"),
        Some(dir.path()),
        1433,
        "NOM",
    )
    .unwrap();

    assert_eq!(index.out_files.len(), 1);
    assert_eq!(
        index.out_files[0].file_name().unwrap().to_str().unwrap(),
        "clkutils_top_CLK_TOP_BEGIN_X_indexed.csv"
    );
    assert_eq!(
        index.tag_headers,
        Some(
            ["DCM", "Ratio", "Test", "Stage", "Field"]
                .map(String::from)
                .to_vec()
        )
    );

    // 2 setups x 2 ratios x 1 fielded stage x 2 fields
    let table = DataTable::read_csv(&index.out_files[0]).unwrap();
    assert_eq!(table.n_rows(), 8);
    assert_eq!(table.cell(0, 0), "0");
    assert_eq!(table.cell(0, 1), "DCM0");
    assert_eq!(table.cell(0, 2), "r_8");
    assert_eq!(table.cell(0, 6), "CLK_TOP_BEGIN_X");
    assert_eq!(table.cell(0, 7), "CLK_TOP_BEGIN_X_0");
    assert_eq!(table.cell(0, 8), "DCM0---r_8---freq_sweep---S1---F1");
    // indices run densely within the group
    assert_eq!(table.cell(7, 0), "7");
}

#[test]
fn over_limit_groups_get_numbered_suffixes_and_counter_resets() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = write_config(dir.path());

    // 8 expected rows against a limit of 3: suffixes _1.._3
    let index = index_clkutils(
        &json_path,
        Some("CLK_TOP_BEGIN_X"),
        Some(dir.path()),
        3,
        "NOM",
    )
    .unwrap();

    let table = DataTable::read_csv(&index.out_files[0]).unwrap();
    let names: Vec<&str> = (0..table.n_rows()).map(|r| table.cell(r, 6)).collect();
    assert_eq!(
        names,
        vec![
            "CLK_TOP_BEGIN_X_1",
            "CLK_TOP_BEGIN_X_1",
            "CLK_TOP_BEGIN_X_1",
            "CLK_TOP_BEGIN_X_2",
            "CLK_TOP_BEGIN_X_2",
            "CLK_TOP_BEGIN_X_2",
            "CLK_TOP_BEGIN_X_3",
            "CLK_TOP_BEGIN_X_3",
        ]
    );
    let indices: Vec<&str> = (0..table.n_rows()).map(|r| table.cell(r, 0)).collect();
    assert_eq!(indices, vec!["0", "1", "2", "0", "1", "2", "0", "1"]);
}

#[test]
fn exactly_at_limit_keeps_unsuffixed_names() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = write_config(dir.path());

    let index = index_clkutils(
        &json_path,
        Some("CLK_TOP_BEGIN_X"),
        Some(dir.path()),
        8,
        "NOM",
    )
    .unwrap();

    let table = DataTable::read_csv(&index.out_files[0]).unwrap();
    assert_eq!(table.n_rows(), 8);
    for r in 0..table.n_rows() {
        assert_eq!(table.cell(r, 6), "CLK_TOP_BEGIN_X");
    }
}

#[test]
fn cbb_region_derives_modifier_per_group() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = write_config(dir.path());

    let index = index_clkutils(
        &json_path,
        Some("CLK_TOP_SDTBEGIN_X"),
        Some(dir.path()),
        1433,
        "NOM",
    )
    .unwrap();

    assert_eq!(index.out_files.len(), 1);
    let table = DataTable::read_csv(&index.out_files[0]).unwrap();
    // each cbb group: 1 setup x 2 ratios x 2 fields = 4 rows
    assert_eq!(table.n_rows(), 8);
    assert_eq!(table.cell(0, 6), "CLK_TOP_SDTBEGIN_X_east");
    assert_eq!(table.cell(4, 6), "CLK_TOP_SDTBEGIN_X_west");
    // per-group counters restart
    assert_eq!(table.cell(4, 0), "0");
}
