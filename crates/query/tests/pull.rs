use std::cell::RefCell;
use std::path::Path;

use ctv_query::{
    uber_request, Connection, PulledData, QueryCursor, QueryError, QuerySpec, UberBridge,
};
use ctv_table::DataTable;
use pretty_assertions::assert_eq;

const PULL_COLUMNS: [&str; 9] = [
    "LOT",
    "OPERATION",
    "PROGRAM_NAME",
    "WAFER_ID",
    "SORT_X",
    "SORT_Y",
    "INTERFACE_BIN",
    "TEST_NAME",
    "STRING_RESULT",
];

/// Canned per-datasource responses; empty vec means "no rows".
struct MockBridge {
    responses: Vec<(&'static str, Vec<Vec<String>>)>,
    executed: RefCell<Vec<String>>,
}

struct MockConnection<'a> {
    rows: Vec<Vec<String>>,
    executed: &'a RefCell<Vec<String>>,
}

struct MockCursor {
    rows: Vec<Vec<String>>,
}

impl UberBridge for MockBridge {
    fn connect(&self, datasource: &str) -> ctv_query::Result<Box<dyn Connection + '_>> {
        let rows = self
            .responses
            .iter()
            .find(|(name, _)| *name == datasource)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| QueryError::Database {
                datasource: datasource.to_string(),
                message: "unknown datasource".to_string(),
            })?;
        Ok(Box::new(MockConnection {
            rows,
            executed: &self.executed,
        }))
    }
}

impl Connection for MockConnection<'_> {
    fn execute(&mut self, sql: &str) -> ctv_query::Result<Box<dyn QueryCursor>> {
        self.executed.borrow_mut().push(sql.to_string());
        Ok(Box::new(MockCursor {
            rows: self.rows.clone(),
        }))
    }
}

impl QueryCursor for MockCursor {
    fn columns(&self) -> Vec<String> {
        PULL_COLUMNS.map(String::from).to_vec()
    }

    fn rows(&mut self) -> ctv_query::Result<Vec<Vec<String>>> {
        Ok(std::mem::take(&mut self.rows))
    }
}

fn result_row(test_name: &str, value: &str) -> Vec<String> {
    vec![
        "L1".to_string(),
        "6100".to_string(),
        "DACX".to_string(),
        "W1".to_string(),
        "2".to_string(),
        "3".to_string(),
        "1".to_string(),
        test_name.to_string(),
        value.to_string(),
    ]
}

fn write_indexed(dir: &Path) -> std::path::PathBuf {
    let mut table = DataTable::new(
        ["Index", "Name", "combined_string"]
            .map(String::from)
            .to_vec(),
    );
    for (i, name) in ["TEST_A", "TEST_A", "TEST_B"].iter().enumerate() {
        table
            .push_row(vec![
                i.to_string(),
                name.to_string(),
                format!("tag---{i}"),
            ])
            .unwrap();
    }
    let path = dir.join("my_test_indexed.csv");
    table.write_csv(&path).unwrap();
    path
}

fn spec(databases: &[&str]) -> QuerySpec {
    QuerySpec {
        databases: databases.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

#[test]
fn rows_land_in_datapulled_file() {
    let dir = tempfile::tempdir().unwrap();
    let indexed = write_indexed(dir.path());
    let bridge = MockBridge {
        responses: vec![(
            "DB1",
            vec![
                result_row("TEST_A_PASS", "1|2|3"),
                result_row("TEST_B_FAIL", "4"),
            ],
        )],
        executed: RefCell::new(Vec::new()),
    };

    let PulledData {
        pulled_file,
        data_found,
    } = uber_request(
        &bridge,
        &indexed,
        "MOD::my_test",
        "",
        false,
        Some(dir.path()),
        &spec(&["DB1"]),
    )
    .unwrap();

    assert!(data_found);
    assert_eq!(
        pulled_file.file_name().unwrap().to_str().unwrap(),
        "my_test_datapulled.csv"
    );
    let pulled = DataTable::read_csv(&pulled_file).unwrap();
    assert_eq!(pulled.headers(), &PULL_COLUMNS.map(String::from));
    assert_eq!(pulled.n_rows(), 2);
    assert_eq!(pulled.cell(0, 8), "1|2|3");

    // duplicate names deduplicate and suffix in the generated SQL
    let executed = bridge.executed.borrow();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].contains("TEST_A_FAIL"));
    assert!(executed[0].contains("TEST_A_PASS"));
    assert_eq!(executed[0].matches("TEST_A_PASS").count(), 1);
}

#[test]
fn empty_database_falls_through_to_next() {
    let dir = tempfile::tempdir().unwrap();
    let indexed = write_indexed(dir.path());
    let bridge = MockBridge {
        responses: vec![
            ("EMPTY_DB", vec![]),
            ("FULL_DB", vec![result_row("TEST_A_PASS", "9")]),
        ],
        executed: RefCell::new(Vec::new()),
    };

    let pulled = uber_request(
        &bridge,
        &indexed,
        "my_test",
        "",
        false,
        Some(dir.path()),
        &spec(&["EMPTY_DB", "FULL_DB"]),
    )
    .unwrap();

    assert!(pulled.data_found);
    let table = DataTable::read_csv(&pulled.pulled_file).unwrap();
    assert_eq!(table.n_rows(), 1);
    assert_eq!(table.cell(0, 8), "9");
}

#[test]
fn no_data_anywhere_leaves_identity_stub() {
    let dir = tempfile::tempdir().unwrap();
    let indexed = write_indexed(dir.path());
    let bridge = MockBridge {
        responses: vec![("EMPTY_DB", vec![])],
        executed: RefCell::new(Vec::new()),
    };

    let pulled = uber_request(
        &bridge,
        &indexed,
        "my_test",
        "",
        false,
        Some(dir.path()),
        &spec(&["EMPTY_DB"]),
    )
    .unwrap();

    assert!(!pulled.data_found);
    let table = DataTable::read_csv(&pulled.pulled_file).unwrap();
    assert_eq!(
        table.headers(),
        &["LOT", "WAFER_ID", "SORT_X", "SORT_Y"].map(String::from)
    );
    assert_eq!(table.n_rows(), 0);
}

#[test]
fn unknown_datasource_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let indexed = write_indexed(dir.path());
    let bridge = MockBridge {
        responses: vec![("GOOD_DB", vec![result_row("TEST_B_FAIL", "5")])],
        executed: RefCell::new(Vec::new()),
    };

    let pulled = uber_request(
        &bridge,
        &indexed,
        "my_test",
        "",
        false,
        Some(dir.path()),
        &spec(&["MISSING_DB", "GOOD_DB"]),
    )
    .unwrap();

    assert!(pulled.data_found);
}

struct UnavailableBridge;

impl UberBridge for UnavailableBridge {
    fn connect(&self, _datasource: &str) -> ctv_query::Result<Box<dyn Connection + '_>> {
        Err(QueryError::BridgeUnavailable("driver not installed".into()))
    }
}

#[test]
fn unavailable_bridge_escalates() {
    let dir = tempfile::tempdir().unwrap();
    let indexed = write_indexed(dir.path());

    let err = uber_request(
        &UnavailableBridge,
        &indexed,
        "my_test",
        "",
        false,
        Some(dir.path()),
        &spec(&["DB1"]),
    )
    .unwrap_err();
    assert!(matches!(err, QueryError::BridgeUnavailable(_)));
}
