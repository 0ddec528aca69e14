/// Report writers
///
/// Each analysis emits the same summary three ways: a plain-text report, a
/// workbook that also carries the loaded data, and a one-page PDF.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::core::summary::{StatValue, Statistics, StatisticsTable, Summary};
use crate::core::table::{format_float, DataTable, Value};

pub const PDF_TITLE: &str = "Data Analysis Report";

// US letter, Helvetica 10pt
const PAGE_WIDTH: Mm = Mm(215.9);
const PAGE_HEIGHT: Mm = Mm(279.4);
const MARGIN_LEFT: Mm = Mm(10.6);
const MARGIN_TOP: Mm = Mm(14.1);
const MARGIN_BOTTOM: f32 = 14.1;
const TITLE_GAP: Mm = Mm(7.1);
const LINE_GAP: Mm = Mm(5.3);
const FONT_SIZE: f32 = 10.0;

/// Longest entry value printed on a PDF line
const PDF_VALUE_LIMIT: usize = 100;

const XLSX_MAX_ROWS: usize = 1_048_576;
const XLSX_MAX_COLUMNS: usize = 16_384;
const XLSX_MAX_STRING: usize = 32_767;

/// First `limit` characters of `text`
pub fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Save the summary as a text file, one `key: value` line per entry
pub fn save_txt_report(summary: &Summary, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create TXT report: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    for (key, value) in summary.entries() {
        writeln!(writer, "{}: {}", key, value).context("Failed to write TXT report")?;
    }

    writer.flush().context("Failed to flush TXT report")?;
    debug!("Wrote {}", output_path.display());
    Ok(())
}

/// Save the data and its summary into a workbook
///
/// # Arguments
///
/// * `table` - Loaded data, written to the `Data` sheet without an index column
/// * `summary` - Written as one row to the `Summary` sheet; the statistics
///   grid goes to a `Statistics` sheet when it applies
/// * `output_path` - Path where the workbook will be written
pub fn save_excel_report(table: &DataTable, summary: &Summary, output_path: &Path) -> Result<()> {
    if table.n_rows() + 1 > XLSX_MAX_ROWS || table.n_columns() > XLSX_MAX_COLUMNS {
        bail!(
            "Table of {} rows x {} columns does not fit in a worksheet",
            table.n_rows(),
            table.n_columns()
        );
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    write_data_sheet(workbook.add_worksheet(), table, &header)
        .context("Failed to write Data sheet")?;
    write_summary_sheet(workbook.add_worksheet(), summary, &header)
        .context("Failed to write Summary sheet")?;
    if let Statistics::Table(stats) = &summary.statistics {
        write_statistics_sheet(workbook.add_worksheet(), stats, &header)
            .context("Failed to write Statistics sheet")?;
    }

    workbook
        .save(output_path)
        .with_context(|| format!("Failed to save XLSX report: {}", output_path.display()))?;

    debug!("Wrote {}", output_path.display());
    Ok(())
}

fn write_data_sheet(sheet: &mut Worksheet, table: &DataTable, header: &Format) -> Result<(), XlsxError> {
    sheet.set_name("Data")?;

    for (col, column) in table.columns().iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, truncate_chars(column.name(), XLSX_MAX_STRING), header)?;

        for (row, value) in column.values().iter().enumerate() {
            let row = row as u32 + 1;
            match value {
                Value::Missing => {}
                Value::Bool(b) => {
                    sheet.write_boolean(row, col, *b)?;
                }
                Value::Int(v) => {
                    sheet.write_number(row, col, *v as f64)?;
                }
                Value::Float(v) if v.is_finite() => {
                    sheet.write_number(row, col, *v)?;
                }
                Value::Float(v) => {
                    sheet.write_string(row, col, format_float(*v))?;
                }
                Value::Text(s) => {
                    sheet.write_string(row, col, truncate_chars(s, XLSX_MAX_STRING))?;
                }
            }
        }
    }

    Ok(())
}

fn write_summary_sheet(sheet: &mut Worksheet, summary: &Summary, header: &Format) -> Result<(), XlsxError> {
    sheet.set_name("Summary")?;

    for (col, (key, value)) in summary.entries().into_iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, key, header)?;
        sheet.write_string(1, col, truncate_chars(&value, XLSX_MAX_STRING))?;
    }

    Ok(())
}

fn write_statistics_sheet(
    sheet: &mut Worksheet,
    stats: &StatisticsTable,
    header: &Format,
) -> Result<(), XlsxError> {
    sheet.set_name("Statistics")?;

    for (row, label) in stats.labels().iter().enumerate() {
        sheet.write_string_with_format(row as u32 + 1, 0, label.as_str(), header)?;
    }

    for (col, column) in stats.columns().iter().enumerate() {
        let col = col as u16 + 1;
        sheet.write_string_with_format(0, col, truncate_chars(column.name(), XLSX_MAX_STRING), header)?;

        for (row, label) in stats.labels().iter().enumerate() {
            let row = row as u32 + 1;
            match column.get(*label) {
                StatValue::Count(n) => {
                    sheet.write_number(row, col, n as f64)?;
                }
                StatValue::Number(v) if v.is_finite() => {
                    sheet.write_number(row, col, v)?;
                }
                StatValue::Text(s) => {
                    sheet.write_string(row, col, truncate_chars(&s, XLSX_MAX_STRING))?;
                }
                StatValue::Number(_) | StatValue::NaN => {}
            }
        }
    }

    Ok(())
}

/// Save the summary into a simple PDF report
///
/// One line per entry under a title; long values are cut at 100 characters
/// and a new page starts when the bottom margin is reached.
pub fn save_pdf_report(summary: &Summary, output_path: &Path) -> Result<()> {
    let (doc, page, layer) = PdfDocument::new(PDF_TITLE, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("PDF font error: {e}"))?;

    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT - MARGIN_TOP;

    current.use_text(PDF_TITLE, FONT_SIZE, MARGIN_LEFT, y, &font);
    y -= TITLE_GAP;

    for (key, value) in summary.entries() {
        let line = format!("{}: {}", key, truncate_chars(&value, PDF_VALUE_LIMIT));
        current.use_text(line, FONT_SIZE, MARGIN_LEFT, y, &font);
        y -= LINE_GAP;

        if y.0 < MARGIN_BOTTOM {
            let (page, layer) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            current = doc.get_page(page).get_layer(layer);
            y = PAGE_HEIGHT - MARGIN_TOP;
        }
    }

    let file = File::create(output_path)
        .with_context(|| format!("Failed to create PDF report: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer).map_err(|e| anyhow!("PDF save error: {e}"))?;

    debug!("Wrote {}", output_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::summary::generate_summary;
    use calamine::{open_workbook, Data, Reader, Xlsx};

    fn sample_table() -> DataTable {
        let headers = vec!["city".to_string(), "temp".to_string()];
        let rows = vec![
            vec!["Oslo".to_string(), "3.5".to_string()],
            vec!["Rome".to_string(), "".to_string()],
            vec!["Oslo".to_string(), "3.5".to_string()],
        ];
        DataTable::from_text_records(headers, rows)
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("åäö", 2), "åä");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }

    #[test]
    fn test_txt_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        let summary = generate_summary(&sample_table());

        save_txt_report(&summary, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Shape: (3, 2)");
        assert_eq!(lines[2], r#"Missing Values: {"city": 0, "temp": 1}"#);
        assert_eq!(lines[3], "Duplicates: 1");
        assert!(lines[4].starts_with("Statistics: {"));
    }

    #[test]
    fn test_excel_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let table = sample_table();
        let summary = generate_summary(&table);

        save_excel_report(&table, &summary, &path).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Data", "Summary", "Statistics"]);

        let data = workbook.worksheet_range("Data").unwrap();
        assert_eq!(data.get_value((0, 0)), Some(&Data::String("city".into())));
        assert_eq!(data.get_value((1, 1)), Some(&Data::Float(3.5)));

        let sheet = workbook.worksheet_range("Summary").unwrap();
        assert_eq!(sheet.get_value((0, 3)), Some(&Data::String("Duplicates".into())));
        assert_eq!(sheet.get_value((1, 0)), Some(&Data::String("(3, 2)".into())));
    }

    #[test]
    fn test_excel_report_without_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        let table = DataTable::empty();
        let summary = generate_summary(&table);

        save_excel_report(&table, &summary, &path).unwrap();

        let workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Data", "Summary"]);
    }

    #[test]
    fn test_pdf_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        let summary = generate_summary(&sample_table());

        save_pdf_report(&summary, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
