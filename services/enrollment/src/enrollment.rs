//! Enrollment entry points: fetch, parse, merge, reshape and cache.

use crate::cache::{CacheEntry, CacheKey, DiskCache};
use crate::config::EnrollmentConfig;
use crate::error::{Error, Result};
use headcount_collector::{
    fetch_first, headcount_candidates, report_card_candidates, CountDay, Download, FetchError,
    FetchedFile, HeadcountRequest, HttpClient, HEADCOUNT_YEARS, REPORT_CARD_YEARS,
};
use headcount_parser::{
    merge_entities, parse_headcount, parse_report_card, state_total, tidy_enrollment, DataKind,
    EnrollmentRecord, EntityLevel, HeadcountFile, ReportCardRecord, TidyRecord,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

pub const REPORT_CARD_TAG: &str = "reportcards";

/// Which published dataset a year list refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataSource {
    #[default]
    Headcounts,
    ReportCards,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Headcounts => f.write_str("headcounts"),
            DataSource::ReportCards => f.write_str("reportcards"),
        }
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "headcounts" => Ok(DataSource::Headcounts),
            "reportcards" => Ok(DataSource::ReportCards),
            other => Err(format!(
                "unknown source '{}' (expected headcounts or reportcards)",
                other
            )),
        }
    }
}

/// End years published for `source`, ascending.
pub fn available_years(source: DataSource) -> Vec<i32> {
    match source {
        DataSource::Headcounts => HEADCOUNT_YEARS.collect(),
        DataSource::ReportCards => REPORT_CARD_YEARS.collect(),
    }
}

pub fn validate_year(end_year: i32) -> Result<()> {
    if HEADCOUNT_YEARS.contains(&end_year) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "end year {} is outside {}-{}",
            end_year,
            HEADCOUNT_YEARS.start(),
            HEADCOUNT_YEARS.end()
        )))
    }
}

/// Count day from user input ("45", "135" or "180").
pub fn parse_count_day(value: &str) -> Result<CountDay> {
    value.parse().map_err(Error::Validation)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Long format when true, one row per entity when false
    pub tidy: bool,
    pub use_cache: bool,
    pub count_day: CountDay,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            tidy: true,
            use_cache: true,
            count_day: CountDay::Day45,
        }
    }
}

impl FetchOptions {
    /// `wide` / `tidy`, suffixed with the count day unless it is the default
    /// 45-day count, so different count days never share an entry.
    pub fn cache_tag(&self) -> String {
        let base = if self.tidy { "tidy" } else { "wide" };
        match self.count_day {
            CountDay::Day45 => base.to_string(),
            day => format!("{}_d{}", base, day),
        }
    }
}

/// Result of an enrollment fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", content = "rows", rename_all = "lowercase")]
pub enum EnrollmentTable {
    Wide(Vec<EnrollmentRecord>),
    Tidy(Vec<TidyRecord>),
}

impl EnrollmentTable {
    fn empty(tidy: bool) -> Self {
        if tidy {
            EnrollmentTable::Tidy(Vec::new())
        } else {
            EnrollmentTable::Wide(Vec::new())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            EnrollmentTable::Wide(rows) => rows.len(),
            EnrollmentTable::Tidy(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenate `other` onto `self`. Tables of different shape are
    /// reshaped to tidy first.
    pub fn append(&mut self, other: EnrollmentTable) {
        let current = std::mem::replace(self, EnrollmentTable::Wide(Vec::new()));
        *self = match (current, other) {
            (EnrollmentTable::Wide(mut a), EnrollmentTable::Wide(b)) => {
                a.extend(b);
                EnrollmentTable::Wide(a)
            }
            (EnrollmentTable::Tidy(mut a), EnrollmentTable::Tidy(b)) => {
                a.extend(b);
                EnrollmentTable::Tidy(a)
            }
            (EnrollmentTable::Tidy(mut a), EnrollmentTable::Wide(b)) => {
                a.extend(tidy_enrollment(&b));
                EnrollmentTable::Tidy(a)
            }
            (EnrollmentTable::Wide(a), EnrollmentTable::Tidy(b)) => {
                let mut rows = tidy_enrollment(&a);
                rows.extend(b);
                EnrollmentTable::Tidy(rows)
            }
        };
    }
}

/// The four parsed headcount files for one year. Demographic files are
/// optional: a year without them still yields grade counts.
#[derive(Debug, Clone)]
pub struct RawEnrollment {
    pub end_year: i32,
    pub count_day: CountDay,
    pub district_grade: HeadcountFile,
    pub district_demo: Option<HeadcountFile>,
    pub school_grade: HeadcountFile,
    pub school_demo: Option<HeadcountFile>,
}

/// Wide table for one year: the state row, then districts, then campuses.
pub fn process_enrollment(raw: &RawEnrollment) -> Vec<EnrollmentRecord> {
    let districts = merge_entities(&raw.district_grade, raw.district_demo.as_ref(), raw.end_year);
    let campuses = merge_entities(&raw.school_grade, raw.school_demo.as_ref(), raw.end_year);
    let state = state_total(&districts, raw.end_year);

    info!(
        end_year = raw.end_year,
        districts = districts.len(),
        campuses = campuses.len(),
        "merged enrollment"
    );

    let mut records = Vec::with_capacity(1 + districts.len() + campuses.len());
    records.push(state);
    records.extend(districts);
    records.extend(campuses);
    records
}

/// A failed demographic download degrades to missing demographic values.
fn tolerate_missing_demo(
    result: std::result::Result<FetchedFile, FetchError>,
    request: &HeadcountRequest,
) -> Option<FetchedFile> {
    match result {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(file = %request.label(), error = %e, "demographic file unavailable, continuing without it");
            None
        }
    }
}

/// Entry point bound to an HTTP capability and a cache directory.
pub struct Enrollment<D: Download = HttpClient> {
    client: D,
    config: EnrollmentConfig,
    cache: DiskCache,
}

impl Enrollment<HttpClient> {
    pub fn new(config: EnrollmentConfig) -> Result<Self> {
        let client = HttpClient::new(&config.collector).map_err(|e| Error::Client(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    pub fn from_env() -> Result<Self> {
        Self::new(EnrollmentConfig::from_env())
    }
}

impl<D: Download> Enrollment<D> {
    pub fn with_client(client: D, config: EnrollmentConfig) -> Self {
        let cache = DiskCache::new(config.cache_dir.clone());
        Self {
            client,
            config,
            cache,
        }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    pub fn config(&self) -> &EnrollmentConfig {
        &self.config
    }

    fn max_age(&self) -> Duration {
        Duration::from_secs(self.config.cache_max_age_days.saturating_mul(86_400))
    }

    /// Cached rows for `key` if present, fresh and readable. Unreadable
    /// entries are logged and treated as a miss.
    fn cached<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<Vec<T>> {
        if !self.cache.exists(key, Some(self.max_age())) {
            return None;
        }
        match self.cache.read(key) {
            Ok(rows) => {
                info!(key = %key, "serving from cache");
                Some(rows)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Enrollment for one end year, wide or tidy.
    pub async fn fetch_enrollment(&self, end_year: i32, options: &FetchOptions) -> Result<EnrollmentTable> {
        validate_year(end_year)?;
        let key = CacheKey::new(end_year, options.cache_tag());

        if options.use_cache {
            let hit = if options.tidy {
                self.cached(&key).map(EnrollmentTable::Tidy)
            } else {
                self.cached(&key).map(EnrollmentTable::Wide)
            };
            if let Some(table) = hit {
                return Ok(table);
            }
        }

        let raw = self.get_raw_enrollment(end_year, options.count_day).await?;
        let wide = process_enrollment(&raw);
        let table = if options.tidy {
            EnrollmentTable::Tidy(tidy_enrollment(&wide))
        } else {
            EnrollmentTable::Wide(wide)
        };

        if options.use_cache {
            match &table {
                EnrollmentTable::Wide(rows) => self.cache.write(&key, rows)?,
                EnrollmentTable::Tidy(rows) => self.cache.write(&key, rows)?,
            }
        }

        info!(end_year, rows = table.len(), tag = %key.tag, "enrollment ready");
        Ok(table)
    }

    /// Several years concatenated, fetched one after another. Every invalid
    /// year is reported before anything is fetched; the first failing year
    /// aborts the batch.
    pub async fn fetch_enrollment_multi(&self, end_years: &[i32], options: &FetchOptions) -> Result<EnrollmentTable> {
        if end_years.is_empty() {
            return Err(Error::Validation("no end years given".to_string()));
        }
        let invalid: Vec<String> = end_years
            .iter()
            .filter(|y| !HEADCOUNT_YEARS.contains(*y))
            .map(|y| y.to_string())
            .collect();
        if !invalid.is_empty() {
            return Err(Error::Validation(format!(
                "end years outside {}-{}: {}",
                HEADCOUNT_YEARS.start(),
                HEADCOUNT_YEARS.end(),
                invalid.join(", ")
            )));
        }

        let mut combined = EnrollmentTable::empty(options.tidy);
        for &end_year in end_years {
            combined.append(self.fetch_enrollment(end_year, options).await?);
        }
        Ok(combined)
    }

    /// Download and parse the four headcount files for one year. District
    /// files come first so a broken year fails before the larger school
    /// files are requested.
    pub async fn get_raw_enrollment(&self, end_year: i32, count_day: CountDay) -> Result<RawEnrollment> {
        validate_year(end_year)?;
        let (district_grade, district_demo) = self.fetch_level(end_year, EntityLevel::District, count_day).await?;
        let (school_grade, school_demo) = self.fetch_level(end_year, EntityLevel::School, count_day).await?;

        Ok(RawEnrollment {
            end_year,
            count_day,
            district_grade,
            district_demo,
            school_grade,
            school_demo,
        })
    }

    async fn fetch_level(
        &self,
        end_year: i32,
        level: EntityLevel,
        count_day: CountDay,
    ) -> Result<(HeadcountFile, Option<HeadcountFile>)> {
        let grade_request = HeadcountRequest::new(end_year, level, DataKind::Grade, count_day);
        let grade_file = self.download(&grade_request).await?;
        let grade = parse_headcount(&grade_file.bytes, level, DataKind::Grade)?;
        info!(file = %grade_request.label(), rows = grade.rows.len(), dropped = grade.dropped_rows, "parsed");

        let demo_request = HeadcountRequest::new(end_year, level, DataKind::Demo, count_day);
        let demo = match tolerate_missing_demo(self.download(&demo_request).await, &demo_request) {
            Some(file) => {
                let parsed = parse_headcount(&file.bytes, level, DataKind::Demo)?;
                info!(file = %demo_request.label(), rows = parsed.rows.len(), dropped = parsed.dropped_rows, "parsed");
                Some(parsed)
            }
            None => None,
        };

        Ok((grade, demo))
    }

    async fn download(&self, request: &HeadcountRequest) -> std::result::Result<FetchedFile, FetchError> {
        let candidates = headcount_candidates(&self.config.collector.headcount_base_url, request);
        fetch_first(&self.client, &request.label(), &candidates, &self.config.collector).await
    }

    /// School and district report card data for one end year.
    pub async fn fetch_report_cards(&self, end_year: i32, use_cache: bool) -> Result<Vec<ReportCardRecord>> {
        if !REPORT_CARD_YEARS.contains(&end_year) {
            return Err(Error::Validation(format!(
                "report card end year {} is outside {}-{}",
                end_year,
                REPORT_CARD_YEARS.start(),
                REPORT_CARD_YEARS.end()
            )));
        }

        let key = CacheKey::new(end_year, REPORT_CARD_TAG);
        if use_cache {
            if let Some(rows) = self.cached(&key) {
                return Ok(rows);
            }
        }

        let label = format!("{} report card", end_year);
        let candidates = report_card_candidates(&self.config.collector.report_card_base_url, end_year);
        let file = fetch_first(&self.client, &label, &candidates, &self.config.collector).await?;
        let records = parse_report_card(&file.bytes, end_year)?;

        if use_cache {
            self.cache.write(&key, &records)?;
        }
        info!(end_year, rows = records.len(), "report cards ready");
        Ok(records)
    }

    pub fn cache_status(&self) -> Result<Vec<CacheEntry>> {
        self.cache.status()
    }

    /// Returns the number of entries removed.
    pub fn clear_cache(&self, end_year: Option<i32>, tag: Option<&str>) -> Result<usize> {
        let removed = self.cache.clear(end_year, tag)?;
        info!(removed, "cache cleared");
        Ok(removed)
    }
}
