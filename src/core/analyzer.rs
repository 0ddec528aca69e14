/// Core file analyzer implementation
///
/// `FileAnalyzer` runs the whole pipeline for one file: read it into a table,
/// summarise it, write the three reports and render the missing-value
/// heatmap.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};

use crate::config::AppConfig;
use crate::core::reader::read_file;
use crate::core::summary::{generate_summary, Summary};
use crate::utils::file_utils::{extension_of, get_file_metadata, sanitize_filename, FileMetadata};
use crate::utils::heatmap::{generate_plot, PLOT_FILE_NAME};
use crate::utils::report_writer::{save_excel_report, save_pdf_report, save_txt_report};

/// Hex digits of the source path digest kept in per-source names
const SOURCE_DIGEST_LEN: usize = 8;

/// How report and plot files are named
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportNaming {
    /// `report_{timestamp}` and `plot.png`
    Timestamped,
    /// `{tag}_report_{timestamp}` and `{tag}_plot.png`, where the tag is
    /// built from the source stem, extension and path
    PerSource,
}

/// Paths of the reports written for one analysis
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSet {
    pub txt: PathBuf,
    pub xlsx: PathBuf,
    pub pdf: PathBuf,
}

impl ReportSet {
    fn with_base(folder: &Path, base: &str) -> Self {
        Self {
            txt: folder.join(format!("{}.txt", base)),
            xlsx: folder.join(format!("{}.xlsx", base)),
            pdf: folder.join(format!("{}.pdf", base)),
        }
    }

    pub fn paths(&self) -> [&Path; 3] {
        [self.txt.as_path(), self.xlsx.as_path(), self.pdf.as_path()]
    }

    /// Base names of the reports, in txt/xlsx/pdf order
    pub fn file_names(&self) -> Vec<String> {
        self.paths()
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .collect()
    }
}

/// Everything one analysis produced
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub source: PathBuf,
    pub metadata: FileMetadata,
    pub summary: Summary,
    pub reports: ReportSet,
    pub plot_path: PathBuf,
    pub elapsed: Duration,
}

impl AnalysisOutcome {
    pub fn to_json(&self) -> JsonValue {
        json!({
            "source": self.source.display().to_string(),
            "metadata": self.metadata,
            "summary": self.summary.to_json(),
            "reports": self.reports.paths().iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "plot": self.plot_path.display().to_string(),
            "elapsed_seconds": self.elapsed.as_secs_f64(),
        })
    }
}

/// Result of one file in a batch: the source path and the outcome or the
/// rendered error
pub type BatchResult = (String, std::result::Result<AnalysisOutcome, String>);

/// Core file analyzer structure
#[derive(Debug, Clone)]
pub struct FileAnalyzer {
    /// Folder receiving the txt/xlsx/pdf reports
    report_dir: PathBuf,
    /// Folder receiving the heatmap
    plot_dir: PathBuf,
    naming: ReportNaming,
}

impl FileAnalyzer {
    pub fn new(report_dir: impl Into<PathBuf>, plot_dir: impl Into<PathBuf>, naming: ReportNaming) -> Self {
        Self {
            report_dir: report_dir.into(),
            plot_dir: plot_dir.into(),
            naming,
        }
    }

    /// Analyzer used by the web front end: reports next to the uploads,
    /// the heatmap in the static folder as `plot.png`
    pub fn for_web(config: &AppConfig) -> Self {
        Self::new(&config.upload_folder, &config.static_folder, ReportNaming::Timestamped)
    }

    /// Analyzer used for batches: everything in one folder, named after the
    /// source file
    pub fn for_batch(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self::new(output_dir.clone(), output_dir, ReportNaming::PerSource)
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    pub fn plot_dir(&self) -> &Path {
        &self.plot_dir
    }

    /// Name prefix for per-source outputs: `{stem}_{ext}_{digest}`
    ///
    /// The digest covers the full source path, so `data.csv` and
    /// `data.json`, or two `data.csv` in different folders, never share
    /// output files.
    fn source_tag(file_path: &Path) -> String {
        let stem = file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let ext = extension_of(file_path);
        let digest = hex::encode(Sha256::digest(file_path.to_string_lossy().as_bytes()));

        let tag = match ext.trim_start_matches('.') {
            "" => sanitize_filename(&stem),
            ext => format!("{}_{}", sanitize_filename(&stem), ext),
        };
        format!("{}_{}", tag, &digest[..SOURCE_DIGEST_LEN])
    }

    fn report_base(&self, file_path: &Path, timestamp: &str) -> String {
        match self.naming {
            ReportNaming::Timestamped => format!("report_{}", timestamp),
            ReportNaming::PerSource => format!("{}_report_{}", Self::source_tag(file_path), timestamp),
        }
    }

    fn plot_file_name(&self, file_path: &Path) -> String {
        match self.naming {
            ReportNaming::Timestamped => PLOT_FILE_NAME.to_string(),
            ReportNaming::PerSource => format!("{}_plot.png", Self::source_tag(file_path)),
        }
    }

    /// Analyze a file and write its reports
    ///
    /// # Arguments
    ///
    /// * `file_path` - Path to the file to analyze
    ///
    /// # Returns
    ///
    /// The summary along with the written report and plot paths. Reading
    /// failures keep their `AnalyzerError` so callers can downcast them.
    pub fn analyze_file(&self, file_path: &Path) -> Result<AnalysisOutcome> {
        let start_time = Instant::now();
        info!("Analyzing {}", file_path.display());

        let table = read_file(file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        let metadata = get_file_metadata(file_path)?;
        let summary = generate_summary(&table);

        fs::create_dir_all(&self.report_dir).with_context(|| {
            format!("Failed to create report folder: {}", self.report_dir.display())
        })?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let reports = ReportSet::with_base(&self.report_dir, &self.report_base(file_path, &timestamp));

        save_txt_report(&summary, &reports.txt)?;
        save_excel_report(&table, &summary, &reports.xlsx)?;
        save_pdf_report(&summary, &reports.pdf)?;

        let plot_path = generate_plot(&table, &self.plot_dir, &self.plot_file_name(file_path))?;

        let elapsed = start_time.elapsed();
        info!(
            "Analyzed {} ({} rows x {} columns) in {:.2?}",
            file_path.display(),
            summary.shape.0,
            summary.shape.1,
            elapsed
        );

        Ok(AnalysisOutcome {
            source: file_path.to_path_buf(),
            metadata,
            summary,
            reports,
            plot_path,
            elapsed,
        })
    }
}
