/// Data Analyzer - summary statistics and reports for data files
///
/// The main entry point. `serve` starts the upload web front end, `analyze`
/// runs the same pipeline over files or a directory from the command line.

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};
use colored::Colorize;
use log::{error, info, warn, LevelFilter};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use walkdir::WalkDir;

use data_analyzer::app::{run_analyzer, worker_count};
use data_analyzer::config::AppConfig;
use data_analyzer::core::analyzer::FileAnalyzer;
use data_analyzer::utils::file_utils::{glob_match, is_supported_file};
use data_analyzer::utils::output_formatter;
use data_analyzer::web;

/// Command line argument structure
#[derive(Parser, Debug)]
#[command(
    name = "data_analyzer",
    version,
    about = "Summary statistics and reports for CSV, Excel, JSON, TXT and PDF files",
    long_about = "Loads a data file into a table and writes:
- a text report with shape, columns, missing values, duplicates and statistics
- the same summary as an Excel workbook and a PDF document
- a missing-value heatmap as PNG"
)]
struct Cli {
    /// Path to configuration file (JSON)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Set logging level (default: INFO)
    #[arg(long = "log-level", default_value = "info", global = true)]
    log_level: LevelFilter,

    /// Write the log to this file instead of stderr
    #[arg(long = "log-file", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the upload web front end
    Serve(ServeArgs),
    /// Analyze files from the command line
    Analyze(AnalyzeArgs),
}

#[derive(ClapArgs, Debug)]
struct ServeArgs {
    /// Address to listen on (default: 127.0.0.1:5000)
    #[arg(long = "bind")]
    bind: Option<String>,

    /// Folder for uploads and their reports
    #[arg(long = "upload-dir")]
    upload_dir: Option<PathBuf>,

    /// Folder served under /static, receives the heatmap
    #[arg(long = "static-dir")]
    static_dir: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct AnalyzeArgs {
    /// Path(s) to the file(s) to analyze
    #[arg(name = "file_paths")]
    file_paths: Vec<PathBuf>,

    /// Analyze all supported files in directory (recursively)
    #[arg(long = "dir")]
    dir: Option<PathBuf>,

    /// Include only file pattern (glob syntax, can be used multiple times)
    #[arg(long = "include", action = ArgAction::Append)]
    include: Option<Vec<String>>,

    /// Exclude file pattern (glob syntax, can be used multiple times)
    #[arg(long = "exclude", action = ArgAction::Append)]
    exclude: Option<Vec<String>>,

    /// Maximum file size to analyze in MB (default: 50)
    #[arg(long = "max-size", default_value = "50")]
    max_size: u64,

    /// Maximum number of files to analyze (default: 1000)
    #[arg(long = "max-files", default_value = "1000")]
    max_files: usize,

    /// Directory receiving reports and heatmaps (default: from config)
    #[arg(long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Export all results to a JSON file
    #[arg(long = "json")]
    json: Option<PathBuf>,

    /// Output in markdown format (wrapped in triple backticks)
    #[arg(long = "md", action = ArgAction::SetTrue)]
    md: bool,

    /// Suppress terminal output
    #[arg(long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Show only summary information
    #[arg(long = "summary-only", action = ArgAction::SetTrue)]
    summary_only: bool,

    /// Number of parallel workers (0=auto, default: auto)
    #[arg(long = "parallel", default_value = "0")]
    parallel: usize,
}

/// Main entry point function
fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level, cli.log_file.as_deref());

    let config = AppConfig::load(cli.config.as_deref());

    match cli.command {
        Command::Serve(args) => serve(config, args),
        Command::Analyze(args) => analyze(config, args),
    }
}

/// Set up logging to stderr or a log file
fn setup_logging(level: LevelFilter, log_file: Option<&Path>) {
    let mut builder = env_logger::Builder::new();

    builder.filter_level(level);

    builder.format(|buf, record| {
        use chrono::Local;
        use std::io::Write;
        writeln!(
            buf,
            "{} - {} - {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.target(),
            record.args()
        )
    });

    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {}: {}", path.display(), e),
        }
    }

    builder.init();
}

fn serve(mut config: AppConfig, args: ServeArgs) -> Result<()> {
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(dir) = args.upload_dir {
        config.upload_folder = dir;
    }
    if let Some(dir) = args.static_dir {
        config.static_folder = dir;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    runtime.block_on(web::serve(config))
}

fn analyze(config: AppConfig, args: AnalyzeArgs) -> Result<()> {
    let start_time = Instant::now();

    if args.file_paths.is_empty() && args.dir.is_none() {
        return Err(anyhow!("No input: pass file paths or --dir"));
    }

    let files_to_analyze = get_files_to_analyze(&args);
    if files_to_analyze.is_empty() {
        eprintln!("{}", "Error: No files specified or found for analysis".red());
        eprintln!("Run with --help for usage information");
        process::exit(1);
    }

    let output_dir = args.output_dir.clone().unwrap_or(config.report_folder);
    let analyzer = FileAnalyzer::for_batch(&output_dir);

    if !args.quiet {
        println!(
            "\n{} {} files with {} workers...",
            "Analyzing".bold(),
            files_to_analyze.len(),
            worker_count(args.parallel)
        );
    }

    let all_results = run_analyzer(&files_to_analyze, &analyzer, args.parallel, !args.quiet)?;

    if let Some(json_path) = &args.json {
        output_formatter::export_results_json(&all_results, json_path)?;
        info!("Wrote results to {}", json_path.display());
    }

    if !args.quiet {
        println!("\n{}", "Analysis Complete".bold());
        println!("{}", output_formatter::create_summary(&all_results));
        println!(
            "{} {:.2} seconds",
            "Time elapsed:".green(),
            start_time.elapsed().as_secs_f64()
        );

        if !args.summary_only {
            for (file_path, outcome) in &all_results {
                println!("\n{}", "=".repeat(80).bold());
                println!("{} {}", "Results for:".cyan(), file_path);
                println!("{}", "=".repeat(80).bold());

                match outcome {
                    Ok(outcome) => println!("{}", output_formatter::format_summary(outcome, args.md)),
                    Err(message) => println!("{} {}", "Error:".red(), message),
                }
            }
        }
    }

    if all_results.iter().all(|(_, outcome)| outcome.is_err()) {
        process::exit(1);
    }

    Ok(())
}

/// Get list of files to analyze based on command line arguments
fn get_files_to_analyze(args: &AnalyzeArgs) -> Vec<PathBuf> {
    let mut files_to_analyze = Vec::new();
    let max_size_bytes = args.max_size * 1024 * 1024;

    for path in &args.file_paths {
        if !path.exists() {
            error!("File not found: {}", path.display());
            continue;
        }
        if !path.is_file() {
            warn!("Skipping {}: not a file", path.display());
            continue;
        }
        match path.metadata() {
            Ok(metadata) if metadata.len() <= max_size_bytes => files_to_analyze.push(path.clone()),
            Ok(metadata) => warn!(
                "Skipping {}: exceeds maximum file size ({:.2} MB)",
                path.display(),
                metadata.len() as f64 / 1024.0 / 1024.0
            ),
            Err(e) => error!("Error reading metadata for {}: {}", path.display(), e),
        }
    }

    if let Some(dir_path) = &args.dir {
        if !dir_path.is_dir() {
            error!("Directory not found: {}", dir_path.display());
            return files_to_analyze;
        }

        let include_patterns = args.include.clone().unwrap_or_else(|| vec!["*".to_string()]);
        let exclude_patterns = args.exclude.clone().unwrap_or_default();

        for entry in WalkDir::new(dir_path)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if files_to_analyze.len() >= args.max_files {
                warn!("Reached maximum file limit ({})", args.max_files);
                break;
            }

            let file_path = entry.path();
            if !file_path.is_file() || !is_supported_file(file_path) {
                continue;
            }

            match file_path.metadata() {
                Ok(metadata) if metadata.len() > max_size_bytes => continue,
                Ok(_) => {}
                Err(e) => {
                    error!("Error reading metadata for {}: {}", file_path.display(), e);
                    continue;
                }
            }

            let file_name = file_path.to_string_lossy();
            let include_match = include_patterns.iter().any(|pattern| glob_match(&file_name, pattern));
            let exclude_match = exclude_patterns.iter().any(|pattern| glob_match(&file_name, pattern));

            if include_match && !exclude_match {
                files_to_analyze.push(file_path.to_path_buf());
            }
        }
    }

    files_to_analyze
}
