use assert_cmd::Command;
use predicates::prelude::*;

fn ctvlist() -> Command {
    Command::cargo_bin("ctvlist").unwrap()
}

#[test]
fn stack_subcommand_writes_datastacked_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("my_test_dataoutput.csv");
    std::fs::write(
        &input,
        "Lot_WafXY,LOT,WAFER_ID,SORT_X,SORT_Y,DCM0---r_8---S1\nL1_W1_2_0,L1,W1,2,0,42\n",
    )
    .unwrap();

    ctvlist()
        .args(["stack", "--input"])
        .arg(&input)
        .args(["--labels", "DCM,Ratio,Stage"])
        .assert()
        .success()
        .stdout(predicate::str::contains("my_test_datastacked.csv"));

    let stacked = std::fs::read_to_string(dir.path().join("my_test_datastacked.csv")).unwrap();
    assert!(stacked.starts_with("Lot_WafXY,LOT,WAFER_ID,SORT_X,SORT_Y,DCM,Ratio,Stage,Data"));
    assert!(stacked.contains("DCM0,r_8,S1,42"));
}

#[test]
fn parse_mtpl_subcommand_emits_test_and_port_csvs() {
    let dir = tempfile::tempdir().unwrap();
    let mtpl = dir.path().join("MOD.mtpl");
    std::fs::write(
        &mtpl,
        r#"CSharpTest CtvDecoderSpm MY_TEST
{
    ConfigurationFile = ".\Modules\MOD\InputFiles\dec.csv";
}
"#,
    )
    .unwrap();

    ctvlist()
        .args(["parse-mtpl", "--mtpl"])
        .arg(&mtpl)
        .args(["--place-in"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("MOD.mtpl.csv"));

    let tests_csv = std::fs::read_to_string(dir.path().join("MOD.mtpl.csv")).unwrap();
    assert!(tests_csv.contains("CtvDecoderSpm,MY_TEST"));
}

#[test]
fn query_without_bridge_reports_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let indexed = dir.path().join("t_indexed.csv");
    std::fs::write(&indexed, "Name,combined_string\nT_A,x---y\n").unwrap();

    ctvlist()
        .env_remove("CTV_UBER_CMD")
        .args(["query", "--indexed"])
        .arg(&indexed)
        .args(["--test", "t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bridge"));
}
