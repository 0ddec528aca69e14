/// In-memory data table
///
/// Every file format is loaded into a `DataTable`: a list of named columns,
/// each holding one inferred kind of value. All columns have the same
/// length; short input rows are padded with missing cells.

use std::collections::{HashMap, HashSet};
use std::fmt;

use lazy_static::lazy_static;

lazy_static! {
    /// Field contents that load as a missing cell
    static ref NA_VALUES: HashSet<&'static str> = [
        "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan",
        "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a",
        "nan", "null",
    ]
    .into_iter()
    .collect();
}

/// Check whether a raw field denotes a missing value
pub fn is_na_token(field: &str) -> bool {
    NA_VALUES.contains(field)
}

fn parse_bool_token(field: &str) -> Option<bool> {
    match field {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}

/// Render a float the way reports show numbers: integral values keep one
/// decimal place, non-finite values are spelled out
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        format!("{}inf", sign)
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// A single cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Hashable view of a cell, used for duplicate and distinct-value counting.
/// Two missing cells compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum CellKey<'a> {
    Missing,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(&'a str),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric view of the cell, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub(crate) fn key(&self) -> CellKey<'_> {
        match self {
            Value::Missing => CellKey::Missing,
            Value::Bool(b) => CellKey::Bool(*b),
            Value::Int(v) => CellKey::Int(*v),
            Value::Float(v) => {
                let canonical = if *v == 0.0 {
                    0.0f64
                } else if v.is_nan() {
                    f64::NAN
                } else {
                    *v
                };
                CellKey::Float(canonical.to_bits())
            }
            Value::Text(s) => CellKey::Text(s),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => write!(f, "NaN"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Inferred kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnKind {
    /// Numeric columns get mean/std/quantiles, the rest get unique/top/freq
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }

    pub fn dtype(self) -> &'static str {
        match self {
            ColumnKind::Integer => "int64",
            ColumnKind::Float => "float64",
            ColumnKind::Boolean => "bool",
            ColumnKind::Text => "object",
        }
    }
}

/// A named column of cells sharing one kind
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    values: Vec<Value>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }

    /// Non-missing numeric cells in row order
    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().filter_map(Value::as_f64).collect()
    }

    /// Infer a column from raw text fields; `None` marks a missing field
    fn infer_from_text(name: String, raw: Vec<Option<String>>) -> Self {
        let has_missing = raw.iter().any(Option::is_none);

        if raw.iter().all(Option::is_none) {
            let values = vec![Value::Missing; raw.len()];
            return Self { name, kind: ColumnKind::Float, values };
        }

        let ints: Option<Vec<Option<i64>>> = raw
            .iter()
            .map(|field| match field {
                None => Some(None),
                Some(s) => s.parse::<i64>().ok().map(Some),
            })
            .collect();
        if let Some(ints) = ints {
            let (kind, values) = if has_missing {
                let values = ints
                    .into_iter()
                    .map(|v| v.map_or(Value::Missing, |n| Value::Float(n as f64)))
                    .collect();
                (ColumnKind::Float, values)
            } else {
                let values = ints
                    .into_iter()
                    .map(|v| v.map_or(Value::Missing, Value::Int))
                    .collect();
                (ColumnKind::Integer, values)
            };
            return Self { name, kind, values };
        }

        let floats: Option<Vec<Option<f64>>> = raw
            .iter()
            .map(|field| match field {
                None => Some(None),
                // `f64` parsing also takes `NAN` in any case; only listed NA tokens are missing
                Some(s) => s.parse::<f64>().ok().filter(|v| !v.is_nan()).map(Some),
            })
            .collect();
        if let Some(floats) = floats {
            let values = floats
                .into_iter()
                .map(|v| v.map_or(Value::Missing, Value::Float))
                .collect();
            return Self { name, kind: ColumnKind::Float, values };
        }

        let bools: Option<Vec<Option<bool>>> = raw
            .iter()
            .map(|field| match field {
                None => Some(None),
                Some(s) => parse_bool_token(s).map(Some),
            })
            .collect();
        if let Some(bools) = bools {
            let values = bools
                .into_iter()
                .map(|v| v.map_or(Value::Missing, Value::Bool))
                .collect();
            return Self { name, kind: ColumnKind::Boolean, values };
        }

        let values = raw
            .into_iter()
            .map(|field| field.map_or(Value::Missing, Value::Text))
            .collect();
        Self { name, kind: ColumnKind::Text, values }
    }

    /// Unify already typed cells into a single column kind
    fn unify_typed(name: String, values: Vec<Value>) -> Self {
        let mut has_missing = false;
        let mut has_int = false;
        let mut has_float = false;
        let mut has_bool = false;
        let mut has_text = false;

        for value in &values {
            match value {
                Value::Missing => has_missing = true,
                Value::Int(_) => has_int = true,
                Value::Float(_) => has_float = true,
                Value::Bool(_) => has_bool = true,
                Value::Text(_) => has_text = true,
            }
        }

        match (has_int, has_float, has_bool, has_text) {
            (false, false, false, false) => Self { name, kind: ColumnKind::Float, values },
            (true, false, false, false) if !has_missing => {
                Self { name, kind: ColumnKind::Integer, values }
            }
            (_, _, false, false) => {
                let values = values
                    .into_iter()
                    .map(|v| match v {
                        Value::Int(n) => Value::Float(n as f64),
                        other => other,
                    })
                    .collect();
                Self { name, kind: ColumnKind::Float, values }
            }
            (false, false, true, false) => Self { name, kind: ColumnKind::Boolean, values },
            _ => {
                let values = values
                    .into_iter()
                    .map(|v| match v {
                        Value::Missing => Value::Missing,
                        Value::Text(s) => Value::Text(s),
                        other => Value::Text(other.to_string()),
                    })
                    .collect();
                Self { name, kind: ColumnKind::Text, values }
            }
        }
    }
}

/// Give blank headers a positional name and de-duplicate repeated ones
/// (`a`, `a.1`, `a.2`, ...)
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(raw.len());

    for (idx, name) in raw.into_iter().enumerate() {
        let mut column = if name.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            name
        };

        let mut current = counts.get(&column).copied().unwrap_or(0);
        while current > 0 {
            counts.insert(column.clone(), current + 1);
            column = format!("{}.{}", column, current);
            current = counts.get(&column).copied().unwrap_or(0);
        }
        counts.insert(column.clone(), current + 1);
        names.push(column);
    }

    names
}

/// Column-oriented table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<Column>,
    n_rows: usize,
}

impl DataTable {
    /// Table with no rows and no columns
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from raw delimited-text rows
    ///
    /// # Arguments
    ///
    /// * `headers` - Header row
    /// * `rows` - Data rows; short rows are padded, long rows truncated
    pub fn from_text_records(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let names = normalize_headers(headers);
        let width = names.len();
        let n_rows = rows.len();

        let mut raw_columns: Vec<Vec<Option<String>>> =
            (0..width).map(|_| Vec::with_capacity(n_rows)).collect();

        for mut row in rows {
            row.resize(width, String::new());
            for (column, field) in raw_columns.iter_mut().zip(row) {
                column.push(if is_na_token(&field) { None } else { Some(field) });
            }
        }

        let columns = names
            .into_iter()
            .zip(raw_columns)
            .map(|(name, raw)| Column::infer_from_text(name, raw))
            .collect();

        Self { columns, n_rows: if width == 0 { 0 } else { n_rows } }
    }

    /// Build a table from typed, column-oriented cells
    pub fn from_typed_columns(names: Vec<String>, columns: Vec<Vec<Value>>) -> Self {
        let names = normalize_headers(names);
        let n_rows = columns.iter().map(Vec::len).max().unwrap_or(0);

        let columns: Vec<Column> = names
            .into_iter()
            .zip(columns)
            .map(|(name, mut values)| {
                values.resize(n_rows, Value::Missing);
                Column::unify_typed(name, values)
            })
            .collect();

        let n_rows = if columns.is_empty() { 0 } else { n_rows };
        Self { columns, n_rows }
    }

    /// Single `Text` column, whatever the lines contain
    pub fn from_text_column(name: &str, lines: Vec<String>) -> Self {
        let n_rows = lines.len();
        let column = Column {
            name: name.to_string(),
            kind: ColumnKind::Text,
            values: lines.into_iter().map(Value::Text).collect(),
        };
        Self { columns: vec![column], n_rows }
    }

    /// Build a table from typed, row-oriented cells
    pub fn from_typed_rows(names: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = names.len();
        let mut columns: Vec<Vec<Value>> =
            (0..width).map(|_| Vec::with_capacity(rows.len())).collect();

        for mut row in rows {
            row.resize(width, Value::Missing);
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }

        Self::from_typed_columns(names, columns)
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0 || self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.columns.get(column).and_then(|c| c.values.get(row))
    }

    pub fn is_missing(&self, row: usize, column: usize) -> bool {
        self.value(row, column).map_or(false, Value::is_missing)
    }

    /// Missing-cell count per column, in column order
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.missing_count()))
            .collect()
    }

    /// Per-column flags, `true` where the cell is missing
    pub fn missing_mask(&self) -> Vec<Vec<bool>> {
        self.columns
            .iter()
            .map(|c| c.values.iter().map(Value::is_missing).collect())
            .collect()
    }

    /// Number of rows identical to an earlier row
    pub fn duplicate_rows(&self) -> usize {
        let mut seen: HashSet<Vec<CellKey<'_>>> = HashSet::with_capacity(self.n_rows);
        let mut duplicates = 0;

        for row in 0..self.n_rows {
            let key: Vec<CellKey<'_>> = self.columns.iter().map(|c| c.values[row].key()).collect();
            if !seen.insert(key) {
                duplicates += 1;
            }
        }

        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_headers() {
        let names = normalize_headers(strings(&["a", "", "a", "a", "b"]));
        assert_eq!(names, strings(&["a", "Unnamed: 1", "a.1", "a.2", "b"]));
    }

    #[test]
    fn test_text_inference() {
        let table = DataTable::from_text_records(
            strings(&["id", "score", "flag", "name", "empty"]),
            vec![
                strings(&["1", "2.5", "True", "alice", ""]),
                strings(&["2", "NA", "false", "bob", "null"]),
                strings(&["3", "4", "TRUE", "7", ""]),
            ],
        );

        let kinds: Vec<ColumnKind> = table.columns().iter().map(Column::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Integer,
                ColumnKind::Float,
                ColumnKind::Boolean,
                ColumnKind::Text,
                ColumnKind::Float,
            ]
        );
        assert_eq!(table.shape(), (3, 5));
        assert_eq!(table.value(2, 3), Some(&Value::Text("7".to_string())));
        assert!(table.is_missing(1, 1));
    }

    #[test]
    fn test_integer_column_with_gap_becomes_float() {
        let table = DataTable::from_text_records(
            strings(&["n"]),
            vec![strings(&["1"]), strings(&[""]), strings(&["3"])],
        );
        assert_eq!(table.columns()[0].kind(), ColumnKind::Float);
        assert_eq!(table.value(0, 0), Some(&Value::Float(1.0)));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = DataTable::from_text_records(
            strings(&["a", "b", "c"]),
            vec![strings(&["1", "2", "3"]), strings(&["4"])],
        );
        assert_eq!(table.missing_counts(), vec![
            ("a".to_string(), 0),
            ("b".to_string(), 1),
            ("c".to_string(), 1),
        ]);
    }

    #[test]
    fn test_typed_unification() {
        let table = DataTable::from_typed_columns(
            strings(&["ints", "mixed_num", "mixed", "gappy"]),
            vec![
                vec![Value::Int(1), Value::Int(2)],
                vec![Value::Int(1), Value::Float(2.5)],
                vec![Value::Int(1), Value::Text("x".into())],
                vec![Value::Int(1)],
            ],
        );

        let kinds: Vec<ColumnKind> = table.columns().iter().map(Column::kind).collect();
        assert_eq!(
            kinds,
            vec![ColumnKind::Integer, ColumnKind::Float, ColumnKind::Text, ColumnKind::Float]
        );
        assert_eq!(table.value(0, 2), Some(&Value::Text("1".into())));
        assert!(table.is_missing(1, 3));
    }

    #[test]
    fn test_typed_bool_number_mix_and_all_missing() {
        let table = DataTable::from_typed_columns(
            strings(&["flag_or_num", "nothing", "flags"]),
            vec![
                vec![Value::Bool(true), Value::Int(1), Value::Missing],
                vec![Value::Missing, Value::Missing, Value::Missing],
                vec![Value::Bool(false), Value::Missing, Value::Bool(true)],
            ],
        );

        let kinds: Vec<ColumnKind> = table.columns().iter().map(Column::kind).collect();
        assert_eq!(kinds, vec![ColumnKind::Text, ColumnKind::Float, ColumnKind::Boolean]);
        assert_eq!(table.value(0, 0), Some(&Value::Text("true".into())));
        assert_eq!(table.value(1, 0), Some(&Value::Text("1".into())));
        assert!(table.is_missing(2, 0));
        assert_eq!(table.columns()[1].missing_count(), 3);
    }

    #[test]
    fn test_nan_spellings_are_not_numbers() {
        let table = DataTable::from_text_records(
            strings(&["odd_nan", "listed_nan", "inf"]),
            vec![strings(&["NAN", "NaN", "inf"]), strings(&["1.5", "2.5", "1.0"])],
        );

        let kinds: Vec<ColumnKind> = table.columns().iter().map(Column::kind).collect();
        assert_eq!(kinds, vec![ColumnKind::Text, ColumnKind::Float, ColumnKind::Float]);
        assert_eq!(table.value(0, 0), Some(&Value::Text("NAN".into())));
        assert!(table.is_missing(0, 1));
        assert_eq!(table.value(0, 2), Some(&Value::Float(f64::INFINITY)));
    }

    #[test]
    fn test_text_column() {
        let table = DataTable::from_text_column("Text", Vec::new());
        assert_eq!(table.shape(), (0, 1));
        assert_eq!(table.columns()[0].kind(), ColumnKind::Text);
    }

    #[test]
    fn test_duplicate_rows_treat_missing_as_equal() {
        let table = DataTable::from_text_records(
            strings(&["a", "b"]),
            vec![
                strings(&["1", ""]),
                strings(&["1", ""]),
                strings(&["2", "x"]),
                strings(&["1", ""]),
            ],
        );
        assert_eq!(table.duplicate_rows(), 2);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(2.25), "2.25");
        assert_eq!(format_float(f64::NAN), "NaN");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_empty_table() {
        let table = DataTable::from_typed_columns(Vec::new(), Vec::new());
        assert_eq!(table.shape(), (0, 0));
        assert!(table.is_empty());
        assert_eq!(table.duplicate_rows(), 0);
    }
}
