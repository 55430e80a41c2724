use crate::model::{DataKind, EntityLevel};

/// Structural failures while reading a headcount or report-card file.
///
/// Bad individual cells never end up here; they degrade to missing values.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No row carries a well-formed ID, so the file is not the layout we expect
    #[error("no valid '{column}' values found in {level} {kind} file (wrong file or new layout?)")]
    MissingIdColumn {
        column: &'static str,
        level: EntityLevel,
        kind: DataKind,
    },

    /// No school ID header in the report-card preamble
    #[error("report card file has no School ID header in the first {scanned} rows")]
    MissingReportCardHeader { scanned: usize },

    /// Workbook has fewer sheets than requested
    #[error("workbook has no sheet at index {0}")]
    MissingSheet(usize),

    /// calamine could not open or read the workbook
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
}
