use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, ScorecardError};
use crate::normalize::{sheet_names, REGISTER_SHEET};
use crate::types::{CellValue, RawRow, Workbook};

/// Anything that can hand over named sheets of rows.
pub trait TabularSource {
    fn load(&self) -> Result<Workbook>;

    fn describe(&self) -> String;
}

/// Parse one CSV sheet. Blank rows are skipped and short rows are padded
/// with empty cells.
pub fn read_csv_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: RawRow = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(idx, h)| {
                let cell = record.get(idx).map_or(CellValue::Empty, CellValue::from_field);
                (h.as_str(), cell)
            })
            .collect();
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

/// One `<sheet name>.csv` file per sheet inside a directory.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{sheet}.csv"))
    }
}

impl TabularSource for CsvDirectorySource {
    fn load(&self) -> Result<Workbook> {
        let mut workbook = Workbook::new();
        for sheet in sheet_names() {
            let path = self.sheet_path(sheet);
            if !path.exists() {
                debug!(sheet, path = %path.display(), "sheet file not present");
                continue;
            }
            let rows = fs::File::open(&path)
                .map_err(ScorecardError::from)
                .and_then(read_csv_rows);
            match rows {
                Ok(rows) => {
                    debug!(sheet, rows = rows.len(), "loaded sheet");
                    workbook.insert_sheet(sheet, rows);
                }
                // Without the register nothing can be scored.
                Err(e) if sheet == REGISTER_SHEET => return Err(e),
                Err(e) => {
                    warn!(sheet, error = %e, "skipping unreadable KPI sheet");
                    workbook.insert_sheet(sheet, Vec::new());
                }
            }
        }
        info!(source = %self.describe(), "loaded CSV sheets");
        Ok(workbook)
    }

    fn describe(&self) -> String {
        format!("csv directory {}", self.dir.display())
    }
}

fn json_cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::Bool(b) => CellValue::Bool(*b),
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map_or(CellValue::Empty, CellValue::Number),
        Value::String(s) if s.trim().is_empty() => CellValue::Empty,
        Value::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

fn json_sheet_rows(name: &str, rows: &Value) -> Result<Vec<RawRow>> {
    let Value::Array(rows) = rows else {
        return Err(ScorecardError::InvalidWorkbook(format!(
            "sheet {name} must be an array of rows"
        )));
    };
    let mut parsed: Vec<RawRow> = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let Value::Object(cells) = row else {
            return Err(ScorecardError::InvalidWorkbook(format!(
                "row {} of sheet {name} is not an object",
                idx + 1
            )));
        };
        parsed.push(cells.iter().map(|(k, v)| (k.as_str(), json_cell(v))).collect());
    }
    Ok(parsed)
}

/// Parse a `{ "<sheet>": [ { "<column>": <scalar> } ] }` document.
///
/// A malformed register fails the whole workbook; any other malformed sheet
/// is logged and kept as an empty sheet, like an unreadable CSV file.
pub fn parse_workbook_json(text: &str) -> Result<Workbook> {
    let Value::Object(sheets) = serde_json::from_str::<Value>(text)? else {
        return Err(ScorecardError::InvalidWorkbook(
            "top level must be an object of sheets".into(),
        ));
    };

    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        match json_sheet_rows(&name, &rows) {
            Ok(parsed) => workbook.insert_sheet(name, parsed),
            Err(e) if name == REGISTER_SHEET => return Err(e),
            Err(e) => {
                warn!(sheet = %name, error = %e, "skipping malformed sheet");
                workbook.insert_sheet(name, Vec::new());
            }
        }
    }
    Ok(workbook)
}

/// A JSON dump of a remote tabular provider, one array of row objects per
/// sheet.
#[derive(Debug, Clone)]
pub struct JsonWorkbookSource {
    path: PathBuf,
}

impl JsonWorkbookSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TabularSource for JsonWorkbookSource {
    fn load(&self) -> Result<Workbook> {
        let text = fs::read_to_string(&self.path)?;
        let workbook = parse_workbook_json(&text)?;
        info!(source = %self.describe(), sheets = workbook.sheet_names().count(), "loaded JSON workbook");
        Ok(workbook)
    }

    fn describe(&self) -> String {
        format!("json workbook {}", self.path.display())
    }
}

/// Pick an adapter from the path: `.json` files are workbooks, anything else
/// is a CSV directory.
pub fn open_source(path: &Path) -> Box<dyn TabularSource> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        Box::new(JsonWorkbookSource::new(path))
    } else {
        Box::new(CsvDirectorySource::new(path))
    }
}
