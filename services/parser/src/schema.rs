//! Canonical column names for headcount files, keyed by (level, kind).
//!
//! The agency files carry two header rows (labels + sub-labels) whose wording
//! drifts from year to year, so columns are named by position instead.

use crate::model::{DataKind, EntityLevel};

/// Columns that are kept as text and never run through the normalizer.
pub const TEXT_COLUMNS: &[&str] = &["school_id", "district_id", "district_name", "school_name"];

const GRADE_COUNTS: &[&str] = &[
    "total", "grade_pk", "grade_k", "grade_01", "grade_02", "grade_03", "grade_04", "grade_05",
    "grade_06", "grade_07", "grade_08", "grade_09", "grade_10", "grade_11", "grade_12",
];

const DEMO_COUNTS: &[&str] = &[
    "total",
    "female",
    "male",
    "gender_missing",
    "black",
    "native_american",
    "asian",
    "hispanic",
    "pacific_islander",
    "multiracial",
    "white",
    "econ_disadv",
    "not_econ_disadv",
];

/// Name of the ID column (always the first column).
pub fn id_column(level: EntityLevel) -> &'static str {
    match level {
        EntityLevel::School => "school_id",
        EntityLevel::District => "district_id",
    }
}

/// Full positional schema for a file.
pub fn schema(level: EntityLevel, kind: DataKind) -> Vec<&'static str> {
    let mut columns = vec![id_column(level), "district_name"];
    if level == EntityLevel::School {
        columns.push("school_name");
    }
    columns.extend_from_slice(match kind {
        DataKind::Grade => GRADE_COUNTS,
        DataKind::Demo => DEMO_COUNTS,
    });
    columns
}

/// Names for a grid `width` columns wide: the schema truncated to fit, or
/// padded with `col_<n>` (1-based position) past its end.
pub fn column_names(level: EntityLevel, kind: DataKind, width: usize) -> Vec<String> {
    let schema = schema(level, kind);
    (0..width)
        .map(|idx| match schema.get(idx) {
            Some(name) => (*name).to_string(),
            None => format!("col_{}", idx + 1),
        })
        .collect()
}
