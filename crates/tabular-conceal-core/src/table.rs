//! In-memory table with CSV I/O
//!
//! All values are text. An empty cell is treated as missing.

use crate::error::{ConcealError, Result};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

pub type Cell = Option<String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Builds a table from string literals, mapping `""` to a missing cell.
    pub fn from_strs(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
                        .collect()
                })
                .collect(),
        )
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = Option<&str>> {
        self.rows
            .iter()
            .map(move |row| row.get(index).and_then(|c| c.as_deref()))
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(ConcealError::TableFormat("table has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            if record.len() > headers.len() {
                return Err(ConcealError::TableFormat(format!(
                    "row {} has {} cells but the header has {}",
                    rows.len() + 1,
                    record.len(),
                    headers.len()
                )));
            }
            rows.push(
                record
                    .iter()
                    .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
                    .collect(),
            );
        }

        Ok(Self::new(headers, rows))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        debug!("Loaded {} rows from {}", table.rows.len(), path.display());
        Ok(table)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.to_writer(file)?;
        debug!("Wrote {} rows to {}", self.rows.len(), path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_with_missing_cells() {
        let csv = "name,email,age\nAlice,a@x.com,30\nBob,,41\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.headers, vec!["name", "email", "age"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.cell(0, "email"), Some("a@x.com"));
        assert_eq!(table.cell(1, "email"), None);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let csv = "a,b,c\n1\n";
        let table = Table::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0], vec![Some("1".to_string()), None, None]);
    }

    #[test]
    fn test_long_rows_rejected() {
        let csv = "a,b\n1,2,3\n";
        let err = Table::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ConcealError::TableFormat(_)));
    }

    #[test]
    fn test_quoted_values_survive_write() {
        let table = Table::from_strs(&["name", "note"], &[&["Doe, Jane", "said \"hi\""]]);
        let mut out = Vec::new();
        table.to_writer(&mut out).unwrap();

        let reread = Table::from_reader(out.as_slice()).unwrap();
        assert_eq!(reread, table);
    }

    #[test]
    fn test_column_values() {
        let table = Table::from_strs(&["a", "b"], &[&["1", ""], &["2", "x"]]);
        let values: Vec<Option<&str>> = table.column_values(1).collect();
        assert_eq!(values, vec![None, Some("x")]);
        assert_eq!(table.column_index("b"), Some(1));
        assert_eq!(table.column_index("z"), None);
    }
}
