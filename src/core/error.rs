/// Errors raised while loading a file into a table
///
/// Report writers and the pipeline itself use `anyhow`; this enum covers the
/// input side so callers can tell a bad upload apart from a server fault.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    /// Extension not in the dispatch table
    #[error("Unsupported file format! ({0})")]
    UnsupportedFormat(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// A delimited row carried more fields than the header
    #[error("Row {line} has {found} fields, expected {expected}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("No columns to parse from file")]
    EmptyData,

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that does not describe a table
    #[error("JSON is not tabular: {0}")]
    JsonShape(String),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("PDF text extraction failed: {0}")]
    PdfExtract(String),
}

impl AnalyzerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalyzerError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the problem lies in the uploaded file rather than the host
    pub fn is_input_error(&self) -> bool {
        !matches!(self, AnalyzerError::Io { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_error_classification() {
        assert!(AnalyzerError::UnsupportedFormat(".exe".into()).is_input_error());
        assert!(AnalyzerError::EmptyData.is_input_error());

        let io = AnalyzerError::io(
            "missing.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!io.is_input_error());
        assert!(io.to_string().contains("missing.csv"));
    }
}
