/// Format readers
///
/// `read_file` dispatches on the file extension and loads the file into a
/// `DataTable`. Delimited text goes through the `csv` crate, workbooks
/// through `calamine`, JSON through `serde_json` and PDF text through
/// `pdf-extract`.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, info, warn};
use serde_json::{Map, Value as JsonValue};

use crate::core::error::{AnalyzerError, Result};
use crate::core::table::{is_na_token, DataTable, Value};
use crate::utils::file_utils::{self, FileFormat};

/// What to do with a delimited row that has more fields than the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BadLinePolicy {
    Error,
    Skip,
}

/// Detect the file type and read it into a `DataTable`
///
/// # Arguments
///
/// * `file_path` - Path to the file to read
///
/// # Returns
///
/// The loaded table, or `UnsupportedFormat` for unknown extensions
pub fn read_file(file_path: &Path) -> Result<DataTable> {
    let format = file_utils::detect_file_format(file_path)?;
    info!("Reading {} as {}", file_path.display(), format.name());

    let table = match format {
        FileFormat::Csv => read_delimited(file_path, b',', BadLinePolicy::Error)?,
        FileFormat::Excel => read_excel(file_path)?,
        FileFormat::Json => read_json(file_path)?,
        FileFormat::Text => read_delimited(file_path, b'\t', BadLinePolicy::Skip)?,
        FileFormat::Pdf => read_pdf(file_path)?,
    };

    let (rows, columns) = table.shape();
    debug!("Loaded {} rows x {} columns from {}", rows, columns, file_path.display());

    Ok(table)
}

fn read_delimited(file_path: &Path, delimiter: u8, policy: BadLinePolicy) -> Result<DataTable> {
    let file = File::open(file_path).map_err(|e| AnalyzerError::io(file_path, e))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(AnalyzerError::EmptyData);
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record?;

        // Blank line
        if record.len() == 1 && record.get(0) == Some("") {
            continue;
        }

        if record.len() > headers.len() {
            let line = record.position().map_or(0, |p| p.line());
            match policy {
                BadLinePolicy::Error => {
                    return Err(AnalyzerError::RaggedRow {
                        line,
                        expected: headers.len(),
                        found: record.len(),
                    });
                }
                BadLinePolicy::Skip => {
                    warn!(
                        "Skipping line {} of {}: expected {} fields, saw {}",
                        line,
                        file_path.display(),
                        headers.len(),
                        record.len()
                    );
                    skipped += 1;
                    continue;
                }
            }
        }

        rows.push(record.iter().map(str::to_string).collect());
    }

    if skipped > 0 {
        info!("Skipped {} malformed lines in {}", skipped, file_path.display());
    }

    Ok(DataTable::from_text_records(headers, rows))
}

fn read_excel(file_path: &Path) -> Result<DataTable> {
    let mut workbook =
        open_workbook_auto(file_path).map_err(|e| AnalyzerError::Spreadsheet(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AnalyzerError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| AnalyzerError::Spreadsheet(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(cells) => cells
            .iter()
            .map(|cell| match excel_cell(cell) {
                Value::Missing => String::new(),
                other => other.to_string(),
            })
            .collect(),
        None => return Err(AnalyzerError::EmptyData),
    };

    let body: Vec<Vec<Value>> = rows
        .map(|cells| cells.iter().map(excel_cell).collect())
        .collect();

    Ok(DataTable::from_typed_rows(headers, body))
}

fn excel_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Missing,
        Data::Int(v) => Value::Int(*v),
        // Workbooks store every number as a double
        Data::Float(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => Value::Int(*v as i64),
        Data::Float(v) => Value::Float(*v),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if is_na_token(s) => Value::Missing,
        Data::String(s) => Value::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => Value::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Value::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Text(s.clone()),
    }
}

fn read_json(file_path: &Path) -> Result<DataTable> {
    let file = File::open(file_path).map_err(|e| AnalyzerError::io(file_path, e))?;
    let document: JsonValue = serde_json::from_reader(BufReader::new(file))?;
    table_from_json(document)
}

/// Lay a parsed JSON document out as a table
pub fn table_from_json(document: JsonValue) -> Result<DataTable> {
    match document {
        JsonValue::Array(items) => table_from_json_array(items),
        JsonValue::Object(map) => table_from_json_object(map),
        other => Err(AnalyzerError::JsonShape(format!(
            "top-level {} cannot be laid out as a table",
            json_kind(&other)
        ))),
    }
}

fn table_from_json_array(items: Vec<JsonValue>) -> Result<DataTable> {
    if items.is_empty() {
        return Ok(DataTable::empty());
    }

    // Records: one row per object, columns in order of first appearance
    if items.iter().all(JsonValue::is_object) {
        let n_rows = items.len();
        let mut names: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut columns: Vec<Vec<Value>> = Vec::new();

        for (row, item) in items.into_iter().enumerate() {
            let JsonValue::Object(record) = item else {
                continue;
            };
            for (key, value) in record {
                let position = match positions.get(&key) {
                    Some(&position) => position,
                    None => {
                        positions.insert(key.clone(), names.len());
                        names.push(key);
                        columns.push(Vec::with_capacity(n_rows));
                        names.len() - 1
                    }
                };
                let column = &mut columns[position];
                column.resize(row, Value::Missing);
                column.push(json_cell(value));
            }
        }

        for column in &mut columns {
            column.resize(n_rows, Value::Missing);
        }
        return Ok(DataTable::from_typed_columns(names, columns));
    }

    // Rows given as lists: positional column names
    if items.iter().all(JsonValue::is_array) {
        let rows: Vec<Vec<Value>> = items
            .into_iter()
            .map(|item| match item {
                JsonValue::Array(cells) => cells.into_iter().map(json_cell).collect(),
                _ => Vec::new(),
            })
            .collect();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let names = (0..width).map(|i| i.to_string()).collect();
        return Ok(DataTable::from_typed_rows(names, rows));
    }

    if items.iter().all(|item| !item.is_array() && !item.is_object()) {
        let column = items.into_iter().map(json_cell).collect();
        return Ok(DataTable::from_typed_columns(vec!["0".to_string()], vec![column]));
    }

    Err(AnalyzerError::JsonShape(
        "array mixes records, lists and scalar values".to_string(),
    ))
}

fn table_from_json_object(map: Map<String, JsonValue>) -> Result<DataTable> {
    if map.is_empty() {
        return Ok(DataTable::empty());
    }

    // Column name -> { row label -> value }
    if map.values().all(JsonValue::is_object) {
        let mut labels: HashMap<String, usize> = HashMap::new();
        for inner in map.values().filter_map(JsonValue::as_object) {
            for key in inner.keys() {
                let next = labels.len();
                labels.entry(key.clone()).or_insert(next);
            }
        }

        let n_rows = labels.len();
        let mut names = Vec::with_capacity(map.len());
        let mut columns = Vec::with_capacity(map.len());

        for (name, inner) in map {
            let mut column = vec![Value::Missing; n_rows];
            if let JsonValue::Object(inner) = inner {
                for (key, value) in inner {
                    if let Some(&row) = labels.get(&key) {
                        column[row] = json_cell(value);
                    }
                }
            }
            names.push(name);
            columns.push(column);
        }

        return Ok(DataTable::from_typed_columns(names, columns));
    }

    if map.values().any(JsonValue::is_object) {
        return Err(AnalyzerError::JsonShape(
            "cannot mix nested objects with other column values".to_string(),
        ));
    }

    let mut lengths: Vec<usize> = map
        .values()
        .filter_map(JsonValue::as_array)
        .map(Vec::len)
        .collect();
    lengths.dedup();

    let n_rows = match lengths.as_slice() {
        [] => {
            return Err(AnalyzerError::JsonShape(
                "If using all scalar values, you must pass an index".to_string(),
            ))
        }
        [len] => *len,
        _ => {
            return Err(AnalyzerError::JsonShape(
                "All arrays must be of the same length".to_string(),
            ))
        }
    };

    let mut names = Vec::with_capacity(map.len());
    let mut columns = Vec::with_capacity(map.len());

    for (name, value) in map {
        let column = match value {
            JsonValue::Array(cells) => cells.into_iter().map(json_cell).collect(),
            scalar => vec![json_cell(scalar); n_rows],
        };
        names.push(name);
        columns.push(column);
    }

    Ok(DataTable::from_typed_columns(names, columns))
}

fn json_cell(value: JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Missing,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(v) => Value::Int(v),
            None => n.as_f64().map_or(Value::Missing, Value::Float),
        },
        JsonValue::String(s) => Value::Text(s),
        nested => Value::Text(nested.to_string()),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn read_pdf(file_path: &Path) -> Result<DataTable> {
    let bytes = std::fs::read(file_path).map_err(|e| AnalyzerError::io(file_path, e))?;

    // pdf-extract panics on some malformed documents
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .map_err(|_| AnalyzerError::PdfExtract("malformed document".to_string()))?
        .map_err(|e| AnalyzerError::PdfExtract(e.to_string()))?;

    debug!("Extracted {} pages from {}", pages.len(), file_path.display());
    Ok(table_from_pdf_pages(&pages))
}

/// One `Text` row per line of the extracted pages
pub fn table_from_pdf_pages(pages: &[String]) -> DataTable {
    let mut text = String::new();
    for page in pages {
        text.push_str(page);
        text.push('\n');
    }

    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    DataTable::from_text_column("Text", lines)
}
