//! SC School Data - South Carolina enrollment tables from the state's
//! published headcount spreadsheets
//!
//! Responsibilities:
//! - Validate requested end years and count days
//! - Download the school and district grade/demographic files for a year
//! - Parse, merge and total them into state, district and campus rows
//! - Reshape into tidy rows and cache each year's table on disk
//! - Fetch report card data files for the years they are published
//!
//! Usage:
//! ```ignore
//! let enrollment = Enrollment::from_env()?;
//! let table = enrollment.fetch_enrollment(2024, &FetchOptions::default()).await?;
//! ```

pub mod cache;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod export;

pub use cache::{CacheEntry, CacheKey, DiskCache};
pub use config::EnrollmentConfig;
pub use enrollment::{
    available_years, parse_count_day, process_enrollment, validate_year, DataSource, Enrollment,
    EnrollmentTable, FetchOptions, RawEnrollment, REPORT_CARD_TAG,
};
pub use error::{Error, Result};
pub use export::{write_report_cards, write_rows, write_table, OutputFormat};

pub use headcount_collector::CountDay;
pub use headcount_parser::{
    grade_aggregates, EnrollmentRecord, EntityType, GradeLevel, ReportCardRecord, Subgroup,
    TidyRecord,
};
