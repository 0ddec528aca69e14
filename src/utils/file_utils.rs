/// File handling utilities
///
/// This module provides format detection by extension, file metadata and
/// fingerprinting, and the file name checks used by the upload and download
/// paths.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::core::error::AnalyzerError;

lazy_static! {
    static ref UNSAFE_NAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex");
}

/// Longest file name kept after sanitizing
const MAX_FILE_NAME_LEN: usize = 100;
const MAX_EXTENSION_LEN: usize = 16;

/// Input formats the reader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileFormat {
    /// Comma-separated values
    Csv,
    /// XLS / XLSX workbook
    Excel,
    /// JSON document
    Json,
    /// Tab-separated text
    Text,
    /// PDF document, read line by line
    Pdf,
}

impl FileFormat {
    /// Map a lower-cased extension (without the dot) to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "csv" => Some(FileFormat::Csv),
            "xls" | "xlsx" => Some(FileFormat::Excel),
            "json" => Some(FileFormat::Json),
            "txt" => Some(FileFormat::Text),
            "pdf" => Some(FileFormat::Pdf),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Excel => "excel",
            FileFormat::Json => "json",
            FileFormat::Text => "text",
            FileFormat::Pdf => "pdf",
        }
    }
}

/// Lower-cased extension of a path, with the leading dot, or empty
pub fn extension_of(file_path: &Path) -> String {
    file_path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Detect the file format from the path's extension.
///
/// # Arguments
///
/// * `file_path` - Path to the file
///
/// # Returns
///
/// The detected format, or `UnsupportedFormat` for anything else
pub fn detect_file_format(file_path: &Path) -> Result<FileFormat, AnalyzerError> {
    let ext = extension_of(file_path);
    FileFormat::from_extension(ext.trim_start_matches('.'))
        .ok_or(AnalyzerError::UnsupportedFormat(if ext.is_empty() {
            "no extension".to_string()
        } else {
            ext
        }))
}

/// True when the reader can handle this path
pub fn is_supported_file(file_path: &Path) -> bool {
    detect_file_format(file_path).is_ok()
}

/// Descriptive metadata for an analyzed file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub sha256: String,
    pub format: Option<FileFormat>,
}

/// Get file metadata for a given path.
///
/// # Arguments
///
/// * `file_path` - Path to the file
///
/// # Returns
///
/// Name, size, SHA-256 fingerprint and detected format
pub fn get_file_metadata(file_path: &Path) -> Result<FileMetadata> {
    let file_name = file_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let file = File::open(file_path)
        .with_context(|| format!("Failed to open {}", file_path.display()))?;
    let file_size = file.metadata()?.len();
    let sha256 = sha256_hex(file)
        .with_context(|| format!("Failed to fingerprint {}", file_path.display()))?;

    debug!("{} is {} bytes, sha256 {}", file_name, file_size, sha256);

    Ok(FileMetadata {
        file_name,
        file_size,
        sha256,
        format: detect_file_format(file_path).ok(),
    })
}

/// Hex-encoded SHA-256 of everything the reader yields
pub fn sha256_hex<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Turn an uploaded file name into a safe base name.
///
/// Path components are dropped, anything outside `[A-Za-z0-9._-]` becomes
/// `_` and `..` runs are removed. Only the stem is capped in length so the
/// extension survives; an empty stem becomes `upload`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = UNSAFE_NAME_CHARS.replace_all(base, "_").replace("..", "");

    let (stem, ext) = match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => (stem, Some(ext)),
        _ => (cleaned.as_str(), None),
    };

    let ext: Option<String> = ext.map(|ext| ext.chars().take(MAX_EXTENSION_LEN).collect());
    let stem_limit = MAX_FILE_NAME_LEN - ext.as_ref().map_or(0, |ext| ext.len() + 1);

    let stem: String = stem.trim_start_matches('.').chars().take(stem_limit).collect();
    let stem = if stem.is_empty() { "upload".to_string() } else { stem };

    match ext {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

/// True for a plain file name that cannot escape its directory
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
}

/// Simple glob pattern matching (`*` and `?`)
pub fn glob_match(text: &str, pattern: &str) -> bool {
    let escaped = regex::escape(pattern).replace(r"\*", ".*").replace(r"\?", ".");
    match Regex::new(&format!("^{}$", escaped)) {
        Ok(re) => re.is_match(text),
        Err(_) => true,
    }
}
