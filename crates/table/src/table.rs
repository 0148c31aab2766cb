use crate::error::{Result, TableError};
use crate::sentinel::is_empty_or_sentinel;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// In-memory table: ordered named columns over string cells.
///
/// Every pipeline stage reads its input table from CSV, transforms it with
/// the pure operations below, and writes the result back out. Cells are kept
/// as strings throughout because the source formats carry no richer typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a named column, or a `MissingColumn` error.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))
    }

    /// All values of a named column, in row order.
    pub fn column_values(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        &self.rows[row][col]
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: String) {
        self.rows[row][col] = value;
    }

    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.headers.len() {
            return Err(TableError::RowWidth {
                expected: self.headers.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Replace the header list wholesale. The caller owns width consistency;
    /// the count must match the current column count.
    pub fn set_headers(&mut self, headers: Vec<String>) -> Result<()> {
        if headers.len() != self.headers.len() {
            return Err(TableError::RowWidth {
                expected: self.headers.len(),
                got: headers.len(),
            });
        }
        self.headers = headers;
        Ok(())
    }

    pub fn rename_header(&mut self, from: &str, to: &str) {
        if let Some(idx) = self.column_index(from) {
            self.headers[idx] = to.to_string();
        }
    }

    /// Append a column; `values` must cover every row.
    pub fn add_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(TableError::RowWidth {
                expected: self.rows.len(),
                got: values.len(),
            });
        }
        self.headers.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    pub fn drop_columns(&mut self, names: &[String]) {
        let doomed: HashSet<&str> = names.iter().map(String::as_str).collect();
        let keep: Vec<usize> = (0..self.headers.len())
            .filter(|&i| !doomed.contains(self.headers[i].as_str()))
            .collect();
        self.project(&keep);
    }

    /// Reorder columns to exactly `order` (each entry must name an existing
    /// column). Columns not listed are dropped.
    pub fn reorder_columns(&mut self, order: &[String]) -> Result<()> {
        let mut keep = Vec::with_capacity(order.len());
        for name in order {
            keep.push(self.require_column(name)?);
        }
        self.project(&keep);
        Ok(())
    }

    fn project(&mut self, keep: &[usize]) {
        self.headers = keep.iter().map(|&i| self.headers[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| row[i].clone()).collect();
        }
    }

    pub fn sort_rows_by<F>(&mut self, mut key: F)
    where
        F: FnMut(&[String]) -> String,
    {
        self.rows.sort_by_key(|row| key(row));
    }

    pub fn retain_rows<F>(&mut self, mut pred: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|row| pred(row));
    }

    /// Drop exact duplicate rows, keeping the first occurrence.
    pub fn dedup_rows(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    /// Apply `f` to every cell in place.
    pub fn map_cells<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                if let Some(updated) = f(cell) {
                    *cell = updated;
                }
            }
        }
    }

    /// Drop every column in `candidates` whose cells are uniformly
    /// empty/sentinel. Partially-populated columns are kept untouched.
    pub fn drop_uniformly_empty_columns(&mut self, candidates: &[String]) {
        let doomed: Vec<String> = candidates
            .iter()
            .filter_map(|name| {
                let idx = self.column_index(name)?;
                let all_empty = self.rows.iter().all(|r| is_empty_or_sentinel(&r[idx]));
                (all_empty && !self.rows.is_empty()).then(|| name.clone())
            })
            .collect();
        if !doomed.is_empty() {
            log::debug!("Dropping uniformly empty columns: {doomed:?}");
            self.drop_columns(&doomed);
        }
    }

    /// Long-to-wide pivot, keeping the first value per (key, name) group.
    ///
    /// One output row per distinct `index_cols` tuple (first-seen order);
    /// one output column per distinct `name_col` value (first-seen order)
    /// after the index columns. Returns `None` when a named column is absent
    /// or there are no rows to pivot, which callers treat as "use the input
    /// table as-is".
    pub fn pivot_first(
        &self,
        index_cols: &[String],
        name_col: &str,
        value_col: &str,
    ) -> Option<DataTable> {
        if self.rows.is_empty() {
            return None;
        }
        let name_idx = self.column_index(name_col)?;
        let value_idx = self.column_index(value_col)?;
        let key_idxs: Vec<usize> = index_cols
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Option<Vec<_>>>()?;

        let mut wide_names: Vec<String> = Vec::new();
        let mut name_pos: HashMap<String, usize> = HashMap::new();
        let mut key_order: Vec<Vec<String>> = Vec::new();
        let mut cells: HashMap<Vec<String>, HashMap<usize, String>> = HashMap::new();

        for row in &self.rows {
            let key: Vec<String> = key_idxs.iter().map(|&i| row[i].clone()).collect();
            let name = &row[name_idx];
            let pos = *name_pos.entry(name.clone()).or_insert_with(|| {
                wide_names.push(name.clone());
                wide_names.len() - 1
            });
            let entry = cells.entry(key.clone()).or_insert_with(|| {
                key_order.push(key.clone());
                HashMap::new()
            });
            // first value wins on duplicates
            entry.entry(pos).or_insert_with(|| row[value_idx].clone());
        }

        let mut headers = index_cols.to_vec();
        headers.extend(wide_names.iter().cloned());
        let mut out = DataTable::new(headers);
        for key in key_order {
            let values = &cells[&key];
            let mut row = key.clone();
            for pos in 0..wide_names.len() {
                row.push(values.get(&pos).cloned().unwrap_or_default());
            }
            out.rows.push(row);
        }
        Some(out)
    }

    /// Wide-to-long melt: one output row per (input row × non-id column).
    pub fn melt(&self, id_cols: &[String], var_name: &str, value_name: &str) -> Result<DataTable> {
        let id_idxs: Vec<usize> = id_cols
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<_>>>()?;
        let id_set: HashSet<usize> = id_idxs.iter().copied().collect();
        let value_idxs: Vec<usize> = (0..self.headers.len())
            .filter(|i| !id_set.contains(i))
            .collect();

        let mut headers = id_cols.to_vec();
        headers.push(var_name.to_string());
        headers.push(value_name.to_string());
        let mut out = DataTable::new(headers);
        for col in &value_idxs {
            for row in &self.rows {
                let mut melted: Vec<String> = id_idxs.iter().map(|&i| row[i].clone()).collect();
                melted.push(self.headers[*col].clone());
                melted.push(row[*col].clone());
                out.rows.push(melted);
            }
        }
        Ok(out)
    }

    /// Read a CSV file; ragged rows are padded/truncated to the header width.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<DataTable> {
        Self::read_with_delimiter(path.as_ref(), b',')
    }

    /// Read a CSV file, retrying with a tab delimiter when the header comes
    /// back as a single column (some decoder templates are tab-separated).
    pub fn read_csv_flexible(path: impl AsRef<Path>) -> Result<DataTable> {
        let path = path.as_ref();
        let table = Self::read_with_delimiter(path, b',')?;
        if table.n_cols() == 1 {
            let retried = Self::read_with_delimiter(path, b'\t')?;
            if retried.n_cols() > 1 {
                return Ok(retried);
            }
        }
        Ok(table)
    }

    fn read_with_delimiter(path: &Path, delimiter: u8) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let width = headers.len();
        let mut table = DataTable::new(headers);
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            row.truncate(width);
            table.rows.push(row);
        }
        Ok(table)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
