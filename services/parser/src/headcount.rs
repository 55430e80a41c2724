use crate::error::ParseError;
use crate::grid::read_grid;
use crate::model::{DataKind, EntityLevel};
use crate::normalize::normalize_count;
use crate::schema::{column_names, id_column};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// How many preamble rows are searched for the header label.
pub const HEADER_SCAN_ROWS: usize = 15;

/// Zero-based header row used when no label is found (sixth row in Excel).
pub const FALLBACK_HEADER_ROW: usize = 5;

/// First-cell labels that mark the header row (compared trimmed, lowercase).
const HEADER_LABELS: &[&str] = &["school id", "district", "district id"];

/// One entity row of a headcount file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadcountRow {
    pub entity_id: String,
    pub district_name: Option<String>,
    pub school_name: Option<String>,
    /// Normalized counts keyed by canonical column name
    pub counts: BTreeMap<String, Option<f64>>,
}

impl HeadcountRow {
    pub fn count(&self, column: &str) -> Option<f64> {
        self.counts.get(column).copied().flatten()
    }
}

/// A parsed headcount spreadsheet for one (level, kind).
#[derive(Debug, Clone, PartialEq)]
pub struct HeadcountFile {
    pub level: EntityLevel,
    pub kind: DataKind,
    /// Zero-based row the header label was found on (or the fallback)
    pub header_row: usize,
    pub rows: Vec<HeadcountRow>,
    /// Non-blank rows discarded by the ID-format filter
    pub dropped_rows: usize,
}

impl HeadcountFile {
    /// Rows indexed by entity ID; the first row wins on duplicates.
    pub fn by_id(&self) -> HashMap<&str, &HeadcountRow> {
        let mut index = HashMap::with_capacity(self.rows.len());
        for row in &self.rows {
            index.entry(row.entity_id.as_str()).or_insert(row);
        }
        index
    }
}

/// Locate the header row: the first of the first [`HEADER_SCAN_ROWS`] rows
/// whose first cell is a header label, else [`FALLBACK_HEADER_ROW`].
pub fn find_header_row(grid: &[Vec<String>]) -> usize {
    grid.iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| {
            row.first()
                .map(|cell| HEADER_LABELS.contains(&cell.trim().to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .unwrap_or(FALLBACK_HEADER_ROW)
}

/// Parse raw XLS/XLSX bytes (first sheet).
pub fn parse_headcount(
    bytes: &[u8],
    level: EntityLevel,
    kind: DataKind,
) -> Result<HeadcountFile, ParseError> {
    let grid = read_grid(bytes, 0, 0, None)?;
    parse_headcount_grid(&grid, level, kind)
}

/// Parse an already-read grid.
///
/// Data starts two rows below the header (the row in between carries
/// grade/subgroup sub-labels). Rows whose first cell is not a well-formed
/// ID for `level` are dropped and counted; a grid with none left is an error.
pub fn parse_headcount_grid(
    grid: &[Vec<String>],
    level: EntityLevel,
    kind: DataKind,
) -> Result<HeadcountFile, ParseError> {
    let header_row = find_header_row(grid);
    let data = grid.get(header_row + 2..).unwrap_or(&[]);

    let width = data.iter().map(Vec::len).max().unwrap_or(0);
    let names = column_names(level, kind, width);

    let mut rows = Vec::new();
    let mut dropped = 0;

    for row in data {
        let id = row.first().map(|c| c.trim()).unwrap_or("");
        if !level.is_valid_id(id) {
            if row.iter().any(|c| !c.trim().is_empty()) {
                debug!(row = ?row.iter().take(3).collect::<Vec<_>>(), "dropping non-entity row");
                dropped += 1;
            }
            continue;
        }

        let mut district_name = None;
        let mut school_name = None;
        let mut counts = BTreeMap::new();

        for (idx, name) in names.iter().enumerate().skip(1) {
            let cell = row.get(idx).map(|c| c.trim()).unwrap_or("");
            match name.as_str() {
                "district_name" => district_name = non_empty(cell),
                "school_name" => school_name = non_empty(cell),
                _ => {
                    counts.insert(name.clone(), normalize_count(cell));
                }
            }
        }

        rows.push(HeadcountRow {
            entity_id: id.to_string(),
            district_name,
            school_name,
            counts,
        });
    }

    // A file with no usable IDs is malformed, not empty
    if rows.is_empty() {
        return Err(ParseError::MissingIdColumn {
            column: id_column(level),
            level,
            kind,
        });
    }

    if dropped > 0 {
        warn!(
            entity_level = %level,
            kind = %kind,
            dropped,
            kept = rows.len(),
            "dropped rows without a well-formed entity ID"
        );
    }

    Ok(HeadcountFile {
        level,
        kind,
        header_row,
        rows,
        dropped_rows: dropped,
    })
}

fn non_empty(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    /// Layout of the 2024+ school grade files: title block, header on row 6,
    /// a sub-label row, then data and a footnote.
    fn school_grade_grid() -> Vec<Vec<String>> {
        grid(&[
            &["South Carolina Department of Education"],
            &["2023-24 Active Student Headcounts"],
            &["45th Day"],
            &[],
            &["Headcount by Grade"],
            &["School ID", "District", "School", "Total", "PK", "K", "1"],
            &["", "", "", "", "", "", ""],
            &["1560001", "Sample County 1", "Sample Elementary", "500", "20", "40", "45"],
            &["1560002", "Sample County 1", "Sample Middle", "1,234", "*", "", "N/A"],
            &["Total", "", "", "1,734", "20", "40", "45"],
            &["* Counts under 10 are suppressed"],
        ])
    }

    #[test]
    fn test_find_header_row_by_label() {
        assert_eq!(find_header_row(&school_grade_grid()), 5);
    }

    #[test]
    fn test_find_header_row_case_insensitive() {
        let g = grid(&[&["title"], &["  DISTRICT  ", "District Name"], &[], &["0101"]]);
        assert_eq!(find_header_row(&g), 1);
    }

    #[test]
    fn test_find_header_row_fallback() {
        let g = grid(&[&["a"], &["b"], &["c"]]);
        assert_eq!(find_header_row(&g), FALLBACK_HEADER_ROW);
    }

    #[test]
    fn test_header_beyond_scan_window_uses_fallback() {
        let mut rows: Vec<Vec<String>> = (0..20).map(|i| vec![format!("note {}", i)]).collect();
        rows[16] = vec!["School ID".to_string()];
        assert_eq!(find_header_row(&rows), FALLBACK_HEADER_ROW);
    }

    #[test]
    fn test_parse_school_grade_rows() {
        let file =
            parse_headcount_grid(&school_grade_grid(), EntityLevel::School, DataKind::Grade).unwrap();

        assert_eq!(file.header_row, 5);
        assert_eq!(file.rows.len(), 2);
        assert_eq!(file.dropped_rows, 2); // "Total" and the footnote

        let first = &file.rows[0];
        assert_eq!(first.entity_id, "1560001");
        assert_eq!(first.district_name.as_deref(), Some("Sample County 1"));
        assert_eq!(first.school_name.as_deref(), Some("Sample Elementary"));
        assert_eq!(first.count("total"), Some(500.0));
        assert_eq!(first.count("grade_pk"), Some(20.0));
        assert_eq!(first.count("grade_k"), Some(40.0));
        assert_eq!(first.count("grade_01"), Some(45.0));
    }

    #[test]
    fn test_parse_normalizes_counts() {
        let file =
            parse_headcount_grid(&school_grade_grid(), EntityLevel::School, DataKind::Grade).unwrap();
        let second = &file.rows[1];
        assert_eq!(second.count("total"), Some(1234.0));
        assert_eq!(second.count("grade_pk"), None);
        assert_eq!(second.count("grade_k"), None);
        assert_eq!(second.count("grade_01"), None);
        // Columns past the grid width are simply absent
        assert!(!second.counts.contains_key("grade_12"));
    }

    #[test]
    fn test_parse_district_demo_without_label_uses_fallback() {
        let g = grid(&[
            &["title"],
            &[],
            &[],
            &[],
            &[],
            &["Dist", "Name", "Total", "Female", "Male"],
            &["", "", "", "", ""],
            &["156", "Sample County 1", "9,000", "4,400", "4,600"],
            &["0402", "Sample County 2", "3,000", "1,500", "1,500"],
            &["12345", "bad id", "1", "1", "1"],
        ]);
        let file = parse_headcount_grid(&g, EntityLevel::District, DataKind::Demo).unwrap();
        assert_eq!(file.header_row, FALLBACK_HEADER_ROW);
        assert_eq!(file.rows.len(), 2);
        assert_eq!(file.dropped_rows, 1);
        assert_eq!(file.rows[0].count("total"), Some(9000.0));
        assert_eq!(file.rows[0].count("female"), Some(4400.0));
        assert_eq!(file.rows[1].entity_id, "0402");
        assert_eq!(file.rows[1].school_name, None);
    }

    #[test]
    fn test_extra_columns_get_generic_names() {
        let g = grid(&[
            &["District", "Name", "Total"],
            &[],
            &[
                "156", "X", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14",
                "15", "16", "17",
            ],
        ]);
        let file = parse_headcount_grid(&g, EntityLevel::District, DataKind::Grade).unwrap();
        let row = &file.rows[0];
        assert_eq!(row.count("grade_12"), Some(15.0));
        assert_eq!(row.count("col_18"), Some(16.0));
        assert_eq!(row.count("col_19"), Some(17.0));
    }

    #[test]
    fn test_missing_id_column_is_fatal() {
        let g = grid(&[
            &["School ID", "District"],
            &[],
            &["", "Sample County 1", "500"],
            &["", "Sample County 2", "600"],
        ]);
        let err = parse_headcount_grid(&g, EntityLevel::School, DataKind::Grade).unwrap_err();
        assert!(matches!(err, ParseError::MissingIdColumn { column: "school_id", .. }));
    }

    #[test]
    fn test_no_well_formed_ids_is_fatal() {
        let g = grid(&[
            &["School ID", "District"],
            &[],
            &["Sample Elementary", "Sample County 1", "500"],
            &["Sample Middle", "Sample County 1", "600"],
        ]);
        let err = parse_headcount_grid(&g, EntityLevel::School, DataKind::Grade).unwrap_err();
        assert!(matches!(err, ParseError::MissingIdColumn { column: "school_id", .. }));

        let g = grid(&[&["District"], &[], &["Statewide", "10"], &["Notes", ""]]);
        assert!(parse_headcount_grid(&g, EntityLevel::District, DataKind::Grade).is_err());
    }

    #[test]
    fn test_empty_grid_is_fatal() {
        let err = parse_headcount_grid(&[], EntityLevel::District, DataKind::Grade).unwrap_err();
        assert!(err.to_string().contains("district_id"));
    }

    #[test]
    fn test_blank_rows_are_not_counted_as_dropped() {
        let g = grid(&[
            &["District"],
            &[],
            &["156", "A", "10"],
            &["", "", ""],
            &[],
        ]);
        let file = parse_headcount_grid(&g, EntityLevel::District, DataKind::Grade).unwrap();
        assert_eq!(file.rows.len(), 1);
        assert_eq!(file.dropped_rows, 0);
    }

    #[test]
    fn test_parse_headcount_from_xlsx() {
        let bytes = include_bytes!("../fixtures/school_grade_45day.xlsx");
        let file = parse_headcount(bytes, EntityLevel::School, DataKind::Grade).unwrap();

        assert_eq!(file.header_row, 4);
        assert_eq!(file.rows.len(), 2);
        assert_eq!(file.dropped_rows, 1);

        let first = &file.rows[0];
        assert_eq!(first.entity_id, "1560001");
        assert_eq!(first.school_name.as_deref(), Some("Sample Elementary"));
        assert_eq!(first.count("total"), Some(500.0));
        assert_eq!(first.count("grade_k"), Some(40.0));

        let second = &file.rows[1];
        assert_eq!(second.entity_id, "1560002");
        assert_eq!(second.count("total"), Some(612.0));
        assert_eq!(second.count("grade_pk"), None);
        assert_eq!(second.count("grade_k"), None);
    }

    #[test]
    fn test_parse_determinism() {
        let a = parse_headcount_grid(&school_grade_grid(), EntityLevel::School, DataKind::Grade).unwrap();
        let b = parse_headcount_grid(&school_grade_grid(), EntityLevel::School, DataKind::Grade).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_by_id_first_row_wins() {
        let g = grid(&[&["District"], &[], &["156", "First", "1"], &["156", "Second", "2"]]);
        let file = parse_headcount_grid(&g, EntityLevel::District, DataKind::Grade).unwrap();
        let index = file.by_id();
        assert_eq!(index.len(), 1);
        assert_eq!(index["156"].district_name.as_deref(), Some("First"));
    }
}
