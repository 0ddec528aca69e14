/// Utility modules for the data analyzer
///
/// This module contains file handling helpers, the report writers, the
/// heatmap renderer and console/JSON output formatting.

pub mod file_utils;
pub mod heatmap;
pub mod output_formatter;
pub mod report_writer;
