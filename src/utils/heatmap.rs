/// Missing-value heatmap
///
/// Columns run along x and rows down y. Rows and columns are bucketed to the
/// canvas size; a pixel is drawn light when any cell in its bucket is missing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};
use log::{debug, warn};

use crate::core::table::DataTable;

/// File name the web front end always writes
pub const PLOT_FILE_NAME: &str = "plot.png";

pub const PLOT_WIDTH: u32 = 800;
pub const PLOT_HEIGHT: u32 = 600;

pub const PRESENT_COLOR: Rgb<u8> = Rgb([11, 4, 5]);
pub const MISSING_COLOR: Rgb<u8> = Rgb([222, 245, 229]);
const BLANK_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// First and one-past-last source index covered by output cell `i` of `cells`
fn bucket(i: u32, cells: u32, items: usize) -> (usize, usize) {
    let start = i as usize * items / cells as usize;
    let end = ((i as usize + 1) * items / cells as usize).max(start + 1);
    (start, end.min(items))
}

/// Render the missing-value map of a table
pub fn render_missing_heatmap(table: &DataTable) -> RgbImage {
    let (n_rows, n_columns) = table.shape();
    if n_rows == 0 || n_columns == 0 {
        warn!("Table is empty, rendering a blank heatmap");
        return RgbImage::from_pixel(PLOT_WIDTH, PLOT_HEIGHT, BLANK_COLOR);
    }

    let mask = table.missing_mask();

    // one row-bucket strip per column
    let strips: Vec<Vec<bool>> = mask
        .iter()
        .map(|column| {
            (0..PLOT_HEIGHT)
                .map(|y| {
                    let (start, end) = bucket(y, PLOT_HEIGHT, n_rows);
                    column[start..end].iter().any(|&missing| missing)
                })
                .collect()
        })
        .collect();

    let column_ranges: Vec<(usize, usize)> = (0..PLOT_WIDTH)
        .map(|x| bucket(x, PLOT_WIDTH, n_columns))
        .collect();

    RgbImage::from_fn(PLOT_WIDTH, PLOT_HEIGHT, |x, y| {
        let (start, end) = column_ranges[x as usize];
        if strips[start..end].iter().any(|strip| strip[y as usize]) {
            MISSING_COLOR
        } else {
            PRESENT_COLOR
        }
    })
}

/// Render the heatmap and save it as PNG
///
/// # Arguments
///
/// * `table` - Table to plot
/// * `output_folder` - Folder receiving the image, created when absent
/// * `file_name` - Image file name inside the folder
///
/// # Returns
///
/// Path of the written image
pub fn generate_plot(table: &DataTable, output_folder: &Path, file_name: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_folder)
        .with_context(|| format!("Failed to create plot folder: {}", output_folder.display()))?;

    let path = output_folder.join(file_name);
    render_missing_heatmap(table)
        .save_with_format(&path, ImageFormat::Png)
        .with_context(|| format!("Failed to save heatmap: {}", path.display()))?;

    debug!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::table::Value;

    fn table(rows: &[[&str; 2]]) -> DataTable {
        DataTable::from_text_records(
            vec!["a".to_string(), "b".to_string()],
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_bucket() {
        assert_eq!(bucket(0, 600, 2), (0, 1));
        assert_eq!(bucket(599, 600, 2), (1, 2));
        assert_eq!(bucket(0, 2, 10), (0, 5));
        assert_eq!(bucket(1, 2, 10), (5, 10));
    }

    #[test]
    fn test_missing_cells_are_light() {
        let image = render_missing_heatmap(&table(&[["1", ""], ["2", "3"]]));

        assert_eq!(image.dimensions(), (PLOT_WIDTH, PLOT_HEIGHT));
        // column b, first row
        assert_eq!(*image.get_pixel(700, 10), MISSING_COLOR);
        // column b, second row
        assert_eq!(*image.get_pixel(700, 590), PRESENT_COLOR);
        // column a is complete
        assert_eq!(*image.get_pixel(10, 10), PRESENT_COLOR);
    }

    #[test]
    fn test_wide_table_shows_every_missing_column() {
        // two columns per pixel, every second one fully missing
        let n_columns = 2 * PLOT_WIDTH as usize;
        let names = (0..n_columns).map(|i| format!("c{}", i)).collect();
        let columns = (0..n_columns)
            .map(|i| vec![if i % 2 == 0 { Value::Int(1) } else { Value::Missing }])
            .collect();

        let image = render_missing_heatmap(&DataTable::from_typed_columns(names, columns));

        assert!(image.pixels().all(|p| *p == MISSING_COLOR));
    }

    #[test]
    fn test_wide_table_single_missing_column() {
        let n_columns = 3 * PLOT_WIDTH as usize;
        let names = (0..n_columns).map(|i| format!("c{}", i)).collect();
        let columns = (0..n_columns)
            .map(|i| vec![if i == n_columns - 1 { Value::Missing } else { Value::Float(0.5) }])
            .collect();

        let image = render_missing_heatmap(&DataTable::from_typed_columns(names, columns));

        assert_eq!(*image.get_pixel(PLOT_WIDTH - 1, 0), MISSING_COLOR);
        assert_eq!(*image.get_pixel(PLOT_WIDTH - 2, 0), PRESENT_COLOR);
        assert_eq!(*image.get_pixel(0, PLOT_HEIGHT - 1), PRESENT_COLOR);
    }

    #[test]
    fn test_empty_table_is_blank() {
        let image = render_missing_heatmap(&DataTable::empty());
        assert!(image.pixels().all(|p| *p == BLANK_COLOR));
    }

    #[test]
    fn test_generate_plot_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("static");

        let path = generate_plot(&table(&[["1", "2"]]), &folder, PLOT_FILE_NAME).unwrap();

        assert_eq!(path, folder.join(PLOT_FILE_NAME));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
