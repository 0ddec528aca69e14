/// Core module for data analysis
///
/// This module contains the data table, the format readers, the summary
/// statistics and the analyzer that ties them to the report writers.

pub mod analyzer;
pub mod error;
pub mod reader;
pub mod summary;
pub mod table;
