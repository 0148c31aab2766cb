//! Test-list input readers.

use crate::error::{FileIoError, Result};
use ctv_table::DataTable;
use std::path::Path;

/// Read a list of test names from a `.txt` (one per line) or `.csv`
/// (named column) file, detected by extension.
pub fn tests_from_file(path: &Path, column_name: Option<&str>) -> Result<Vec<String>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" => {
            let content = std::fs::read_to_string(path)?;
            Ok(content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect())
        }
        "csv" => {
            let column = column_name.ok_or(FileIoError::MissingColumnName)?;
            let table = DataTable::read_csv(path)?;
            Ok(table.column_values(column)?)
        }
        other => Err(FileIoError::UnsupportedExtension(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn txt_list_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.txt");
        std::fs::write(&path, "T1\n\n T2 \n").unwrap();
        let tests = tests_from_file(&path, None).unwrap();
        assert_eq!(tests, vec!["T1".to_string(), "T2".to_string()]);
    }

    #[test]
    fn csv_list_requires_column_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tests.csv");
        std::fs::write(&path, "Test\nT1\nT2\n").unwrap();
        assert!(tests_from_file(&path, None).is_err());
        let tests = tests_from_file(&path, Some("Test")).unwrap();
        assert_eq!(tests, vec!["T1".to_string(), "T2".to_string()]);
    }
}
