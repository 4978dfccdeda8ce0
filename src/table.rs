// Tabular input: the column model plus loaders for delimited text and
// spreadsheet workbooks.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use tracing::{debug, info, instrument};

use crate::error::{ReportError, Result};

// Extensions read through the workbook loader.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// A named column of text-coerced cells. `None` marks an empty cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Option<String>>,
}

impl Column {
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().filter_map(|cell| cell.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    columns: Vec<Column>,
}

impl RawTable {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Build a table from a header row and data rows.
    ///
    /// Ragged rows are padded with empty cells, and fields beyond the header
    /// get positional names (`column_<n>`, 1-based) as do blank headers.
    /// Repeated names get a `.1`, `.2`, ... suffix so every name is unique.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(headers.len()))
            .max()
            .unwrap_or(0);

        let mut seen = HashSet::new();
        let mut columns: Vec<Column> = (0..width)
            .map(|idx| {
                let base = headers
                    .get(idx)
                    .map(|h| h.trim())
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("column_{}", idx + 1));
                let name = unique_name(base, &mut seen);
                Column {
                    name,
                    cells: Vec::with_capacity(rows.len()),
                }
            })
            .collect();

        for row in rows {
            let mut row = row.into_iter();
            for column in columns.iter_mut() {
                column.cells.push(row.next().flatten());
            }
        }

        Self { columns }
    }

    /// Load a table from disk, dispatching on the file extension.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>, sheet: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let table = if extension == "csv" {
            let file = std::fs::File::open(path).map_err(|err| {
                ReportError::InputRead(format!("failed to open {}: {}", path.display(), err))
            })?;
            Self::from_csv_reader(file)?
        } else if WORKBOOK_EXTENSIONS.contains(&extension.as_str()) {
            Self::from_workbook(path, sheet)?
        } else {
            return Err(ReportError::UnsupportedInput(format!(
                "{} (expected csv, xlsx or xls)",
                path.display()
            )));
        };

        info!(
            columns = table.columns.len(),
            rows = table.row_count(),
            "Table loaded"
        );
        Ok(table)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|err| ReportError::InputRead(format!("invalid CSV header: {}", err)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record =
                record.map_err(|err| ReportError::InputRead(format!("invalid CSV row: {}", err)))?;
            rows.push(
                record
                    .iter()
                    .map(|field| (!field.is_empty()).then(|| field.to_string()))
                    .collect(),
            );
        }

        debug!(rows = rows.len(), "CSV parsed");
        Ok(Self::from_rows(headers, rows))
    }

    // Read the named worksheet (or the first one) of a workbook. The first
    // row is taken as the header.
    fn from_workbook(path: &Path, sheet: Option<&str>) -> Result<Self> {
        let mut workbook = open_workbook_auto(path).map_err(|err| {
            ReportError::InputRead(format!("failed to open {}: {}", path.display(), err))
        })?;

        let range = match sheet {
            Some(name) => workbook
                .worksheet_range(name)
                .map_err(|err| ReportError::InputRead(format!("sheet '{}': {}", name, err)))?,
            None => workbook
                .worksheet_range_at(0)
                .ok_or_else(|| ReportError::InputRead("workbook has no sheets".to_string()))?
                .map_err(|err| ReportError::InputRead(format!("first sheet: {}", err)))?,
        };

        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|row| {
                row.iter()
                    .map(|cell| coerce_cell(cell).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        let rows = rows
            .map(|row| row.iter().map(coerce_cell).collect())
            .collect();

        Ok(Self::from_rows(headers, rows))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.columns.iter().map(|c| c.cells.len()).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.row_count() == 0
    }
}

fn unique_name(base: String, seen: &mut HashSet<String>) -> String {
    let mut name = base.clone();
    let mut suffix = 1;
    while seen.contains(&name) {
        name = format!("{}.{}", base, suffix);
        suffix += 1;
    }
    seen.insert(name.clone());
    name
}

/// Coerce a workbook cell to text. Empty cells yield `None`.
fn coerce_cell(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(format_float(*f)),
        Data::Bool(true) => Some("True".to_string()),
        Data::Bool(false) => Some("False".to_string()),
        other => Some(other.to_string()),
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_headers_become_column_names() {
        let data = "owner,plate\nAli,KHI-1234\nSara,LEB 778\n";
        let table = RawTable::from_csv_reader(data.as_bytes()).unwrap();

        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["owner", "plate"]);
        assert_eq!(table.row_count(), 2);
        let plate: Vec<&str> = table.column("plate").unwrap().values().collect();
        assert_eq!(plate, vec!["KHI-1234", "LEB 778"]);
    }

    #[test]
    fn csv_empty_fields_are_absent() {
        let data = "a,b\n,x\ny,\n";
        let table = RawTable::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(table.column("a").unwrap().cells, vec![None, Some("y".into())]);
        assert_eq!(table.column("b").unwrap().cells, vec![Some("x".into()), None]);
    }

    #[test]
    fn ragged_rows_get_positional_columns() {
        let table = RawTable::from_rows(
            vec!["first".into(), "".into()],
            vec![
                vec![Some("A1".into())],
                vec![Some("B1".into()), Some("B2".into()), Some("B3".into())],
            ],
        );

        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["first", "column_2", "column_3"]);
        assert_eq!(table.columns()[2].cells, vec![None, Some("B3".into())]);
    }

    #[test]
    fn repeated_headers_are_renamed() {
        let data = "plate,plate,plate.1,\nKHI-1234,LEA 778,X,Y\n";
        let table = RawTable::from_csv_reader(data.as_bytes()).unwrap();

        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["plate", "plate.1", "plate.1.1", "column_4"]);
        assert_eq!(table.column_index("plate.1"), Some(1));
        let second: Vec<&str> = table.column("plate.1").unwrap().values().collect();
        assert_eq!(second, vec!["LEA 778"]);
    }

    #[test]
    fn header_only_csv_is_empty() {
        let table = RawTable::from_csv_reader("plate\n".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 1);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = RawTable::from_path("vehicles.txt", None).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedInput(_)));
    }

    #[test]
    fn missing_csv_is_an_input_error() {
        let err = RawTable::from_path("/nonexistent/vehicles.csv", None).unwrap_err();
        assert!(matches!(err, ReportError::InputRead(_)));
    }

    #[test]
    fn workbook_cells_are_coerced_to_text() {
        assert_eq!(coerce_cell(&Data::Empty), None);
        assert_eq!(coerce_cell(&Data::String(String::new())), None);
        assert_eq!(coerce_cell(&Data::Float(1234.0)).as_deref(), Some("1234"));
        assert_eq!(coerce_cell(&Data::Float(12.5)).as_deref(), Some("12.5"));
        assert_eq!(coerce_cell(&Data::Int(42)).as_deref(), Some("42"));
        assert_eq!(coerce_cell(&Data::Bool(true)).as_deref(), Some("True"));
    }
}
