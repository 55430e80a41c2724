use crate::error::ParseError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

/// Sheet contents as trimmed text, addressed from cell A1.
pub type Grid = Vec<Vec<String>>;

/// Read one worksheet of an XLS/XLSX payload into a text grid.
///
/// No row is treated as a header. Leading empty rows and columns are kept as
/// blank cells so row offsets match what the agency's files show in Excel.
pub fn read_grid(
    bytes: &[u8],
    sheet_index: usize,
    skip_rows: usize,
    max_rows: Option<usize>,
) -> Result<Grid, ParseError> {
    // calamine auto-detects format: xls, xlsx, xlsb, ods
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let range = workbook
        .worksheet_range_at(sheet_index)
        .ok_or(ParseError::MissingSheet(sheet_index))??;

    let (first_row, first_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let padded = std::iter::repeat_with(Vec::new)
        .take(first_row)
        .chain(range.rows().map(|row| {
            std::iter::repeat(String::new())
                .take(first_col)
                .chain(row.iter().map(cell_text))
                .collect::<Vec<_>>()
        }))
        .skip(skip_rows);

    let grid = match max_rows {
        Some(limit) => padded.take(limit).collect(),
        None => padded.collect(),
    };

    Ok(grid)
}

/// Render a cell as the text a user would see; whole floats lose their `.0`
/// so numeric IDs such as 1560001 survive the ID-format check.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Int(i) => i.to_string(),
        other => format!("{}", other).trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_text_whole_float_is_integer() {
        assert_eq!(cell_text(&Data::Float(1560001.0)), "1560001");
        assert_eq!(cell_text(&Data::Float(40.0)), "40");
    }

    #[test]
    fn test_cell_text_keeps_fractions() {
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
    }

    #[test]
    fn test_cell_text_strings_trimmed() {
        assert_eq!(cell_text(&Data::String("  School ID ".to_string())), "School ID");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::Int(7)), "7");
    }

    const FIXTURE: &[u8] = include_bytes!("../fixtures/school_grade_45day.xlsx");

    #[test]
    fn test_read_grid_keeps_excel_row_numbers() {
        let grid = read_grid(FIXTURE, 0, 0, None).unwrap();

        // Content starts at A3
        assert_eq!(grid.len(), 9);
        assert!(grid[0].is_empty() && grid[1].is_empty());
        assert_eq!(grid[2][0], "Active Student Headcounts 45th Day 2023-24");
        assert!(grid[3].iter().all(String::is_empty));
        assert_eq!(grid[4][..2], ["School ID", "District"]);

        // Numeric cells come back without a trailing `.0`
        assert_eq!(grid[6][0], "1560001");
        assert_eq!(grid[6][3], "500");
        assert_eq!(grid[7][3], "612");
        assert_eq!(grid[7][5], "*");
        assert_eq!(grid[8][0], "Total");
    }

    #[test]
    fn test_read_grid_pads_leading_columns() {
        let grid = read_grid(FIXTURE, 1, 0, None).unwrap();
        assert_eq!(grid.len(), 3);
        assert!(grid[0].is_empty());
        assert_eq!(grid[1], vec!["", "District", "Total"]);
        assert_eq!(grid[2], vec!["", "156", "900"]);
    }

    #[test]
    fn test_read_grid_skip_and_limit() {
        let grid = read_grid(FIXTURE, 0, 4, Some(3)).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0][0], "School ID");
        assert_eq!(grid[2][0], "1560001");
    }

    #[test]
    fn test_read_grid_missing_sheet() {
        let result = read_grid(FIXTURE, 5, 0, None);
        assert!(matches!(result, Err(ParseError::MissingSheet(5))));
    }

    #[test]
    fn test_read_grid_rejects_non_spreadsheet() {
        let result = read_grid(b"<html>not found</html>", 0, 0, None);
        assert!(matches!(result, Err(ParseError::Spreadsheet(_))));
    }
}
