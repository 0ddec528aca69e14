/// Output formatter for analysis results
///
/// This module handles console rendering of analysis outcomes and the JSON
/// export used by the `analyze` command.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::{json, Map, Value};

use crate::core::analyzer::{AnalysisOutcome, BatchResult};
use crate::core::summary::{StatValue, Statistics};

/// Format one analysis outcome for console output
///
/// # Arguments
///
/// * `outcome` - Result of analyzing a single file
/// * `use_markdown` - Whether to wrap the output in markdown triple backticks
///
/// # Returns
///
/// Formatted string for console output
pub fn format_summary(outcome: &AnalysisOutcome, use_markdown: bool) -> String {
    let mut output = String::new();

    if use_markdown {
        output.push_str("```\n");
    }

    let metadata = &outcome.metadata;
    output.push_str(&format!("{}\n", "File Information".yellow().bold()));
    output.push_str(&format!("  {}: {}\n", "Name".cyan().bold(), metadata.file_name));
    output.push_str(&format!("  {}: {} bytes\n", "Size".cyan().bold(), metadata.file_size));
    if let Some(format) = metadata.format {
        output.push_str(&format!("  {}: {}\n", "Format".cyan().bold(), format.name()));
    }
    output.push_str(&format!("  {}: {}\n\n", "SHA-256".cyan().bold(), metadata.sha256));

    let summary = &outcome.summary;
    output.push_str(&format!("{}\n", "Table".yellow().bold()));
    output.push_str(&format!(
        "  {}: {} rows x {} columns\n",
        "Shape".cyan().bold(),
        summary.shape.0,
        summary.shape.1
    ));
    output.push_str(&format!("  {}: {}\n", "Duplicates".cyan().bold(), summary.duplicates));
    output.push_str(&format!("  {}: {}\n", "Missing Values".cyan().bold(), summary.total_missing()));
    for (column, count) in summary.missing_values.iter().filter(|(_, count)| *count > 0) {
        output.push_str(&format!("    - {}: {}\n", column, count));
    }
    output.push('\n');

    output.push_str(&format!("{}\n", "Statistics".yellow().bold()));
    match &summary.statistics {
        Statistics::NotApplicable(message) => {
            output.push_str(&format!("  {}\n", message));
        }
        Statistics::Table(stats) => {
            for column in stats.columns() {
                let cells: Vec<String> = stats
                    .labels()
                    .iter()
                    .filter_map(|label| match column.get(*label) {
                        StatValue::NaN => None,
                        value => Some(format!("{}={}", label.as_str(), value)),
                    })
                    .collect();
                output.push_str(&format!("  {}: {}\n", column.name().cyan().bold(), cells.join(", ")));
            }
        }
    }
    output.push('\n');

    output.push_str(&format!("{}\n", "Reports".yellow().bold()));
    for path in outcome.reports.paths() {
        output.push_str(&format!("    - {}\n", path.display()));
    }
    output.push_str(&format!("    - {}\n", outcome.plot_path.display()));

    if use_markdown {
        output.push_str("```\n");
    }

    output
}

/// Export batch results to a JSON file
///
/// # Arguments
///
/// * `results` - One entry per analyzed file
/// * `output_path` - Path where the JSON file will be written
///
/// # Returns
///
/// Result indicating success or failure
pub fn export_results_json(results: &[BatchResult], output_path: &Path) -> Result<()> {
    let mut json_output = Map::new();

    for (source, outcome) in results {
        let value = match outcome {
            Ok(outcome) => outcome.to_json(),
            Err(message) => json!({ "error": message }),
        };
        json_output.insert(source.clone(), value);
    }

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output file: {}", output_path.display()))?;

    serde_json::to_writer_pretty(file, &Value::Object(json_output))
        .context("Failed to write JSON data")?;

    Ok(())
}

/// Create a summary of a batch of analyses
///
/// # Arguments
///
/// * `all_results` - Results for multiple files
///
/// # Returns
///
/// Summary string
pub fn create_summary(all_results: &[BatchResult]) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n\n", "Analysis Summary".yellow().bold()));

    let succeeded: Vec<&AnalysisOutcome> = all_results
        .iter()
        .filter_map(|(_, outcome)| outcome.as_ref().ok())
        .collect();
    let failed: Vec<(&String, &String)> = all_results
        .iter()
        .filter_map(|(source, outcome)| outcome.as_ref().err().map(|e| (source, e)))
        .collect();

    let total_rows: usize = succeeded.iter().map(|o| o.summary.shape.0).sum();
    let total_missing: usize = succeeded.iter().map(|o| o.summary.total_missing()).sum();

    output.push_str(&format!("Files analyzed: {}\n", all_results.len()));
    output.push_str(&format!("Failed: {}\n", failed.len()));
    output.push_str(&format!("Total rows: {}\n", total_rows));
    output.push_str(&format!("Total missing cells: {}\n", total_missing));

    if !failed.is_empty() {
        output.push_str(&format!("\n{}\n", "Failures".red().bold()));
        for (i, (source, message)) in failed.iter().enumerate() {
            output.push_str(&format!("{}. {}: {}\n", i + 1, source, message));
        }
    }

    output
}
