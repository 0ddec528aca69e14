/// Summary statistics
///
/// `generate_summary` condenses a table into its shape, column names,
/// missing-value counts, duplicate rows and a column-wise statistics table.
/// The rendered form of a summary (`Summary::entries`) is shared by every
/// report writer.

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};
use serde_json::{json, Map, Value as JsonValue};

use crate::core::table::{format_float, CellKey, Column, DataTable};

/// Statistics placeholder when the table cannot be described
pub const NOT_APPLICABLE: &str = "Not applicable (non-numeric data)";

/// Row labels of the statistics table, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatLabel {
    Count,
    Unique,
    Top,
    Freq,
    Mean,
    Std,
    Min,
    Q25,
    Q50,
    Q75,
    Max,
}

impl StatLabel {
    pub const ALL: [StatLabel; 11] = [
        StatLabel::Count,
        StatLabel::Unique,
        StatLabel::Top,
        StatLabel::Freq,
        StatLabel::Mean,
        StatLabel::Std,
        StatLabel::Min,
        StatLabel::Q25,
        StatLabel::Q50,
        StatLabel::Q75,
        StatLabel::Max,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatLabel::Count => "count",
            StatLabel::Unique => "unique",
            StatLabel::Top => "top",
            StatLabel::Freq => "freq",
            StatLabel::Mean => "mean",
            StatLabel::Std => "std",
            StatLabel::Min => "min",
            StatLabel::Q25 => "25%",
            StatLabel::Q50 => "50%",
            StatLabel::Q75 => "75%",
            StatLabel::Max => "max",
        }
    }

    fn applies_to_numeric(self) -> bool {
        !matches!(self, StatLabel::Unique | StatLabel::Top | StatLabel::Freq)
    }

    fn applies_to_other(self) -> bool {
        matches!(
            self,
            StatLabel::Count | StatLabel::Unique | StatLabel::Top | StatLabel::Freq
        )
    }
}

/// One cell of the statistics table
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Count(usize),
    Number(f64),
    Text(String),
    NaN,
}

impl StatValue {
    pub fn to_json(&self) -> JsonValue {
        match self {
            StatValue::Count(n) => json!(n),
            StatValue::Number(v) if v.is_finite() => json!(v),
            StatValue::Text(s) => json!(s),
            _ => JsonValue::Null,
        }
    }
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Count(n) => write!(f, "{}", n),
            StatValue::Number(v) => write!(f, "{}", format_float(*v)),
            StatValue::Text(s) => write!(f, "{:?}", s),
            StatValue::NaN => write!(f, "NaN"),
        }
    }
}

/// Per-column statistics
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnStats {
    Numeric {
        name: String,
        count: usize,
        mean: f64,
        std: f64,
        min: f64,
        q25: f64,
        q50: f64,
        q75: f64,
        max: f64,
    },
    Categorical {
        name: String,
        count: usize,
        unique: usize,
        top: Option<String>,
        freq: Option<usize>,
    },
}

impl ColumnStats {
    fn describe(column: &Column) -> Self {
        if column.kind().is_numeric() {
            Self::describe_numeric(column)
        } else {
            Self::describe_categorical(column)
        }
    }

    fn describe_numeric(column: &Column) -> Self {
        let mut values = column.numeric_values();
        values.sort_by(|a, b| a.total_cmp(b));

        let count = values.len();
        let (mean, std) = mean_and_std(&values);

        Self::Numeric {
            name: column.name().to_string(),
            count,
            mean,
            std,
            min: values.first().copied().unwrap_or(f64::NAN),
            q25: quantile(&values, 0.25),
            q50: quantile(&values, 0.50),
            q75: quantile(&values, 0.75),
            max: values.last().copied().unwrap_or(f64::NAN),
        }
    }

    fn describe_categorical(column: &Column) -> Self {
        // key -> (first row, occurrences)
        let mut tally: HashMap<CellKey<'_>, (usize, usize)> = HashMap::new();
        let mut count = 0;

        for (row, value) in column.values().iter().enumerate() {
            if value.is_missing() {
                continue;
            }
            count += 1;
            tally.entry(value.key()).or_insert((row, 0)).1 += 1;
        }

        let best = tally
            .values()
            .copied()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)));

        let (top, freq) = match best {
            Some((row, occurrences)) => (
                Some(column.values()[row].to_string()),
                Some(occurrences),
            ),
            None => (None, None),
        };

        Self::Categorical {
            name: column.name().to_string(),
            count,
            unique: tally.len(),
            top,
            freq,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ColumnStats::Numeric { name, .. } | ColumnStats::Categorical { name, .. } => name,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnStats::Numeric { .. })
    }

    /// Cell for one row label; labels that do not apply to the column are NaN
    pub fn get(&self, label: StatLabel) -> StatValue {
        match self {
            ColumnStats::Numeric { count, mean, std, min, q25, q50, q75, max, .. } => match label {
                StatLabel::Count => StatValue::Count(*count),
                StatLabel::Mean => StatValue::Number(*mean),
                StatLabel::Std => StatValue::Number(*std),
                StatLabel::Min => StatValue::Number(*min),
                StatLabel::Q25 => StatValue::Number(*q25),
                StatLabel::Q50 => StatValue::Number(*q50),
                StatLabel::Q75 => StatValue::Number(*q75),
                StatLabel::Max => StatValue::Number(*max),
                StatLabel::Unique | StatLabel::Top | StatLabel::Freq => StatValue::NaN,
            },
            ColumnStats::Categorical { count, unique, top, freq, .. } => match label {
                StatLabel::Count => StatValue::Count(*count),
                StatLabel::Unique => StatValue::Count(*unique),
                StatLabel::Top => top.clone().map_or(StatValue::NaN, StatValue::Text),
                StatLabel::Freq => freq.map_or(StatValue::NaN, StatValue::Count),
                _ => StatValue::NaN,
            },
        }
    }
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    if values.len() < 2 {
        return (mean, f64::NAN);
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

/// Linear-interpolated quantile of already sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Column-wise statistics over the whole table
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsTable {
    labels: Vec<StatLabel>,
    columns: Vec<ColumnStats>,
}

impl StatisticsTable {
    /// Describe every column; `None` when the table has no columns
    pub fn describe(table: &DataTable) -> Option<Self> {
        if table.n_columns() == 0 {
            return None;
        }

        let columns: Vec<ColumnStats> = table.columns().iter().map(ColumnStats::describe).collect();

        let any_numeric = columns.iter().any(ColumnStats::is_numeric);
        let any_other = columns.iter().any(|c| !c.is_numeric());

        let labels = StatLabel::ALL
            .iter()
            .copied()
            .filter(|label| {
                (any_numeric && label.applies_to_numeric()) || (any_other && label.applies_to_other())
            })
            .collect();

        Some(Self { labels, columns })
    }

    pub fn labels(&self) -> &[StatLabel] {
        &self.labels
    }

    pub fn columns(&self) -> &[ColumnStats] {
        &self.columns
    }
}

/// The statistics entry of a summary
#[derive(Debug, Clone, PartialEq)]
pub enum Statistics {
    Table(StatisticsTable),
    NotApplicable(String),
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistics::NotApplicable(message) => write!(f, "{}", message),
            Statistics::Table(table) => {
                let rendered: Vec<String> = table
                    .columns()
                    .iter()
                    .map(|column| {
                        let cells: Vec<String> = table
                            .labels()
                            .iter()
                            .map(|label| format!("{:?}: {}", label.as_str(), column.get(*label)))
                            .collect();
                        format!("{:?}: {{{}}}", column.name(), cells.join(", "))
                    })
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
        }
    }
}

/// Summary of one table
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// `(rows, columns)`
    pub shape: (usize, usize),
    pub columns: Vec<String>,
    /// Missing cells per column, in column order
    pub missing_values: Vec<(String, usize)>,
    pub duplicates: usize,
    pub statistics: Statistics,
}

impl Summary {
    /// Entry keys, in report order
    pub const KEYS: [&'static str; 5] =
        ["Shape", "Columns", "Missing Values", "Duplicates", "Statistics"];

    /// `(key, rendered value)` pairs, in report order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let missing: Vec<String> = self
            .missing_values
            .iter()
            .map(|(name, count)| format!("{:?}: {}", name, count))
            .collect();

        vec![
            (Self::KEYS[0], format!("({}, {})", self.shape.0, self.shape.1)),
            (Self::KEYS[1], format!("{:?}", self.columns)),
            (Self::KEYS[2], format!("{{{}}}", missing.join(", "))),
            (Self::KEYS[3], self.duplicates.to_string()),
            (Self::KEYS[4], self.statistics.to_string()),
        ]
    }

    pub fn total_missing(&self) -> usize {
        self.missing_values.iter().map(|(_, count)| count).sum()
    }

    /// JSON form with keys in report order; NaN cells become `null`
    pub fn to_json(&self) -> JsonValue {
        let missing: Map<String, JsonValue> = self
            .missing_values
            .iter()
            .map(|(name, count)| (name.clone(), json!(count)))
            .collect();

        let statistics = match &self.statistics {
            Statistics::NotApplicable(message) => json!(message),
            Statistics::Table(table) => {
                let columns: Map<String, JsonValue> = table
                    .columns()
                    .iter()
                    .map(|column| {
                        let cells: Map<String, JsonValue> = table
                            .labels()
                            .iter()
                            .map(|label| (label.as_str().to_string(), column.get(*label).to_json()))
                            .collect();
                        (column.name().to_string(), JsonValue::Object(cells))
                    })
                    .collect();
                JsonValue::Object(columns)
            }
        };

        json!({
            "shape": [self.shape.0, self.shape.1],
            "columns": self.columns,
            "missing_values": missing,
            "duplicates": self.duplicates,
            "statistics": statistics,
        })
    }
}

/// Generate summary statistics and insights for a table
pub fn generate_summary(table: &DataTable) -> Summary {
    let statistics = match StatisticsTable::describe(table) {
        Some(stats) => Statistics::Table(stats),
        None => {
            warn!("Table has no columns, statistics not computed");
            Statistics::NotApplicable(NOT_APPLICABLE.to_string())
        }
    };

    let summary = Summary {
        shape: table.shape(),
        columns: table.column_names(),
        missing_values: table.missing_counts(),
        duplicates: table.duplicate_rows(),
        statistics,
    };

    debug!(
        "Summary: shape {:?}, {} missing cells, {} duplicate rows",
        summary.shape,
        summary.total_missing(),
        summary.duplicates
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    fn sample_table() -> DataTable {
        DataTable::from_text_records(
            strings(&["x", "label"]),
            vec![
                strings(&["1", "a"]),
                strings(&["2", "b"]),
                strings(&["3", "a"]),
                strings(&["4", ""]),
            ],
        )
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_numeric_statistics() {
        let summary = generate_summary(&sample_table());
        let Statistics::Table(stats) = &summary.statistics else {
            panic!("expected a statistics table");
        };

        let x = &stats.columns()[0];
        assert_eq!(x.get(StatLabel::Count), StatValue::Count(4));
        match (x.get(StatLabel::Mean), x.get(StatLabel::Std), x.get(StatLabel::Q25)) {
            (StatValue::Number(mean), StatValue::Number(std), StatValue::Number(q25)) => {
                assert!(close(mean, 2.5));
                assert!(close(std, 1.2909944487358056));
                assert!(close(q25, 1.75));
            }
            other => panic!("unexpected stats: {:?}", other),
        }
        assert_eq!(x.get(StatLabel::Max), StatValue::Number(4.0));
        assert_eq!(x.get(StatLabel::Top), StatValue::NaN);
    }

    #[test]
    fn test_categorical_statistics() {
        let summary = generate_summary(&sample_table());
        let Statistics::Table(stats) = &summary.statistics else {
            panic!("expected a statistics table");
        };

        let label = &stats.columns()[1];
        assert_eq!(label.get(StatLabel::Count), StatValue::Count(3));
        assert_eq!(label.get(StatLabel::Unique), StatValue::Count(2));
        assert_eq!(label.get(StatLabel::Top), StatValue::Text("a".into()));
        assert_eq!(label.get(StatLabel::Freq), StatValue::Count(2));
        assert_eq!(label.get(StatLabel::Mean), StatValue::NaN);

        // Mixed table carries every label
        assert_eq!(stats.labels().len(), StatLabel::ALL.len());
    }

    #[test]
    fn test_top_prefers_first_seen_on_ties() {
        let table = DataTable::from_text_records(
            strings(&["c"]),
            vec![strings(&["b"]), strings(&["a"]), strings(&["a"]), strings(&["b"])],
        );
        let stats = StatisticsTable::describe(&table).unwrap();
        assert_eq!(stats.columns()[0].get(StatLabel::Top), StatValue::Text("b".into()));
        assert_eq!(
            stats.labels(),
            &[StatLabel::Count, StatLabel::Unique, StatLabel::Top, StatLabel::Freq]
        );
    }

    #[test]
    fn test_numeric_only_labels() {
        let table = DataTable::from_text_records(strings(&["n"]), vec![strings(&["5"])]);
        let stats = StatisticsTable::describe(&table).unwrap();
        assert!(!stats.labels().contains(&StatLabel::Top));
        assert_eq!(stats.columns()[0].get(StatLabel::Std).to_string(), "NaN");
    }

    #[test]
    fn test_not_applicable_without_columns() {
        let summary = generate_summary(&DataTable::empty());
        assert_eq!(summary.statistics, Statistics::NotApplicable(NOT_APPLICABLE.to_string()));
        assert_eq!(summary.shape, (0, 0));
    }

    #[test]
    fn test_entries_rendering() {
        let summary = generate_summary(&sample_table());
        let entries = summary.entries();

        let keys: Vec<&str> = entries.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, Summary::KEYS.to_vec());
        assert_eq!(entries[0].1, "(4, 2)");
        assert_eq!(entries[1].1, r#"["x", "label"]"#);
        assert_eq!(entries[2].1, r#"{"x": 0, "label": 1}"#);
        assert_eq!(entries[3].1, "0");
        assert!(entries[4].1.starts_with(r#"{"x": {"count": 4, "unique": NaN"#));
    }

    #[test]
    fn test_to_json() {
        let summary = generate_summary(&sample_table());
        let value = summary.to_json();

        assert_eq!(value["shape"], json!([4, 2]));
        assert_eq!(value["missing_values"]["label"], json!(1));
        assert_eq!(value["statistics"]["x"]["mean"], json!(2.5));
        assert!(value["statistics"]["x"]["top"].is_null());
    }
}
