/// Data Analyzer - summary statistics and reports for uploaded data files
///
/// This library loads CSV, Excel, JSON, tab-separated text and PDF files into
/// an in-memory table, describes it, and writes TXT, XLSX and PDF reports plus
/// a missing-value heatmap. A small web front end and a batch runner sit on
/// top of the same pipeline.

pub mod config;
pub mod core;
pub mod utils;
pub mod web;

// Re-export main analyzer types for convenience
pub use crate::config::AppConfig;
pub use crate::core::analyzer::{AnalysisOutcome, FileAnalyzer, ReportNaming};
pub use crate::core::error::AnalyzerError;
pub use crate::core::reader::read_file;
pub use crate::core::summary::{generate_summary, Summary};
pub use crate::core::table::DataTable;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Analyze a single file and return the names of the written reports
///
/// This is a convenience function for simple use cases: reports and the
/// heatmap all land in `output_folder`.
///
/// # Arguments
///
/// * `file_path` - Path to the file to analyze
/// * `output_folder` - Folder receiving the reports and `plot.png`
///
/// # Returns
///
/// Report file names in txt/xlsx/pdf order
pub fn analyze_file<P: AsRef<std::path::Path>, Q: AsRef<std::path::Path>>(
    file_path: P,
    output_folder: Q,
) -> anyhow::Result<Vec<String>> {
    let folder = output_folder.as_ref();
    let analyzer = FileAnalyzer::new(folder, folder, ReportNaming::Timestamped);
    let outcome = analyzer.analyze_file(file_path.as_ref())?;
    Ok(outcome.reports.file_names())
}

/// Command-line application functionality
pub mod app {
    use std::path::PathBuf;

    use indicatif::{ProgressBar, ProgressStyle};
    use log::error;
    use rayon::prelude::*;

    use crate::core::analyzer::{BatchResult, FileAnalyzer};

    /// Number of workers for `requested` (0 = one per logical CPU)
    pub fn worker_count(requested: usize) -> usize {
        if requested == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            requested
        }
    }

    /// Run the analyzer on multiple files
    ///
    /// Files are spread over a local thread pool; each file is still
    /// analyzed sequentially. A failing file is recorded and does not stop
    /// the batch.
    ///
    /// # Arguments
    ///
    /// * `file_paths` - Paths to files to analyze
    /// * `analyzer` - Analyzer shared by every worker
    /// * `workers` - Number of parallel workers (0 = auto)
    /// * `show_progress` - Whether to draw a progress bar
    ///
    /// # Returns
    ///
    /// One entry per input file, in input order
    pub fn run_analyzer(
        file_paths: &[PathBuf],
        analyzer: &FileAnalyzer,
        workers: usize,
        show_progress: bool,
    ) -> anyhow::Result<Vec<BatchResult>> {
        if file_paths.is_empty() {
            return Ok(Vec::new());
        }

        let progress_bar = if show_progress {
            let pb = ProgressBar::new(file_paths.len() as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            Some(pb)
        } else {
            None
        };

        // Create a local thread pool instead of using the global one
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_count(workers))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))?;

        let results: Vec<BatchResult> = pool.install(|| {
            file_paths
                .par_iter()
                .map(|file_path| {
                    let outcome = analyzer.analyze_file(file_path).map_err(|e| {
                        error!("Error analyzing {}: {:#}", file_path.display(), e);
                        format!("{:#}", e)
                    });

                    if let Some(pb) = &progress_bar {
                        pb.inc(1);
                    }

                    (file_path.to_string_lossy().to_string(), outcome)
                })
                .collect()
        });

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Analysis complete");
        }

        Ok(results)
    }
}
