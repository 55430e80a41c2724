//! Headcount Parser - Turns SC headcount spreadsheets into enrollment tables
//!
//! Responsibilities:
//! - Read the first worksheet of an XLS/XLSX file into a text grid
//! - Locate the header row under the title preamble and assign canonical columns
//! - Keep only real entity rows (7-digit school IDs, 3-4 digit district IDs)
//! - Normalize suppressed / formatted counts into numbers or missing values
//! - Merge grade and demographic files, total districts into a state row
//! - Reshape wide rows into tidy (entity, grade_level, subgroup) rows
//!
//! Parsing is DETERMINISTIC: same bytes + same level/kind = same rows.

pub mod aggregate;
pub mod error;
pub mod grid;
pub mod headcount;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod report_card;
pub mod schema;
pub mod tidy;

pub use aggregate::state_total;
pub use error::ParseError;
pub use grid::{read_grid, Grid};
pub use headcount::{find_header_row, parse_headcount, parse_headcount_grid, HeadcountFile, HeadcountRow};
pub use merge::merge_entities;
pub use model::{
    DataKind, EnrollmentRecord, EntityLevel, EntityType, GradeLevel, Subgroup, TidyRecord,
    CHARTER_DISTRICT_ID, COUNT_COLUMNS,
};
pub use normalize::normalize_count;
pub use report_card::{parse_report_card, parse_report_card_grid, ReportCardRecord};
pub use tidy::{grade_aggregates, tidy_enrollment};
