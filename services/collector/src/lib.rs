//! Headcount Collector - Locates and downloads SC enrollment spreadsheets
//!
//! Responsibilities:
//! - Expand the known historical naming patterns into ordered candidate URLs
//! - Fetch candidates in order, rejecting error statuses and error pages
//! - Apply a pause between requests to avoid hammering the agency site
//! - Hash and timestamp what was downloaded

pub mod config;
pub mod fetch;
pub mod urls;

pub use config::CollectorConfig;
pub use fetch::{
    content_hash, fetch_first, Attempt, AttemptFailure, Download, FetchError, FetchedFile,
    HttpClient, HttpResponse, MIN_PAYLOAD_BYTES,
};
pub use urls::{
    headcount_candidates, report_card_candidates, school_year_label, CountDay, HeadcountRequest,
    HEADCOUNT_YEARS, REPORT_CARD_YEARS,
};
