//! Column-oriented tables with CSV persistence.
//!
//! Cells are `Option<String>`; `None` is the null sentinel and round-trips
//! through CSV as an empty field. All pipeline stages exchange data through
//! this type.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use thiserror::Error;

/// Errors returned by table construction and CSV I/O.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
    #[error("row has {got} cells but table has {expected} columns")]
    RowWidth { got: usize, expected: usize },
    #[error("cannot append table with different columns")]
    ColumnMismatch,
}

/// An in-memory table of named columns over nullable string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row; width must match the column count.
    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                got: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Cell at `(row, column)`; `None` for nulls or out-of-range indices.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    /// Rename a column in place. Returns `false` when the source column does
    /// not exist; callers decide whether that is tolerable.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Project onto `columns`, in that order. Columns absent from the table
    /// are added with every cell null.
    pub fn project(&self, columns: &[&str]) -> Table {
        let indices: Vec<Option<usize>> =
            columns.iter().map(|name| self.column_index(name)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|idx| idx.and_then(|i| row[i].clone()))
                    .collect()
            })
            .collect();
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// Append all rows of `other`; both tables must share identical columns.
    pub fn append(&mut self, other: Table) -> Result<(), TableError> {
        if self.columns != other.columns {
            return Err(TableError::ColumnMismatch);
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    /// Keep only the rows whose index satisfies the predicate order given in
    /// `indices`. Indices outside the table are ignored.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let rows = indices
            .iter()
            .filter_map(|&i| self.rows.get(i).cloned())
            .collect();
        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Read a table from a headed CSV file. Empty fields become null.
    pub fn from_csv(path: &Path) -> Result<Table, TableError> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|source| TableError::Open {
            path: display.clone(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(BufReader::new(file));
        let columns: Vec<String> = reader
            .headers()
            .map_err(|source| TableError::Csv {
                path: display.clone(),
                source,
            })?
            .iter()
            .map(str::to_string)
            .collect();
        let mut table = Table::new(columns);
        for record in reader.records() {
            let record = record.map_err(|source| TableError::Csv {
                path: display.clone(),
                source,
            })?;
            let row = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        None
                    } else {
                        Some(field.to_string())
                    }
                })
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Write the table as a headed CSV file. Nulls become empty fields.
    pub fn to_csv(&self, path: &Path) -> Result<(), TableError> {
        let display = path.display().to_string();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| TableError::Open {
                path: display.clone(),
                source,
            })?;
        }
        let file = File::create(path).map_err(|source| TableError::Open {
            path: display.clone(),
            source,
        })?;
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));
        writer
            .write_record(&self.columns)
            .map_err(|source| TableError::Csv {
                path: display.clone(),
                source,
            })?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
                .map_err(|source| TableError::Csv {
                    path: display.clone(),
                    source,
                })?;
        }
        writer.flush().map_err(|source| TableError::Open {
            path: display,
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Table {
        let mut table = Table::new(["a", "b"]);
        table
            .push_row(vec![Some("1".into()), None])
            .expect("row width");
        table
            .push_row(vec![None, Some("x".into())])
            .expect("row width");
        table
    }

    #[test]
    fn csv_round_trip_preserves_nulls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = sample();
        table.to_csv(&path).unwrap();
        let loaded = Table::from_csv(&path).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn project_adds_missing_columns_as_null() {
        let table = sample();
        let projected = table.project(&["b", "c", "a"]);
        assert_eq!(projected.columns(), ["b", "c", "a"]);
        assert_eq!(projected.cell(0, 2), Some("1"));
        assert_eq!(projected.cell(0, 1), None);
        assert_eq!(projected.cell(1, 0), Some("x"));
    }

    #[test]
    fn rename_reports_missing_source() {
        let mut table = sample();
        assert!(table.rename_column("a", "z"));
        assert!(!table.rename_column("nope", "w"));
        assert_eq!(table.columns(), ["z", "b"]);
    }

    #[test]
    fn append_rejects_mismatched_columns() {
        let mut table = sample();
        let other = Table::new(["a", "c"]);
        assert!(matches!(
            table.append(other),
            Err(TableError::ColumnMismatch)
        ));
    }

    #[test]
    fn push_row_rejects_wrong_width() {
        let mut table = sample();
        assert!(matches!(
            table.push_row(vec![None]),
            Err(TableError::RowWidth { got: 1, expected: 2 })
        ));
    }
}
