use headcount_collector::CollectorConfig;
use std::path::PathBuf;

/// Settings for the enrollment entry points.
#[derive(Debug, Clone)]
pub struct EnrollmentConfig {
    pub collector: CollectorConfig,
    pub cache_dir: PathBuf,
    /// Cached tables older than this are refetched
    pub cache_max_age_days: u64,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            collector: CollectorConfig::default(),
            cache_dir: default_cache_dir(),
            cache_max_age_days: 30,
        }
    }
}

impl EnrollmentConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            collector: CollectorConfig::from_env(),
            cache_dir: std::env::var("SCSCHOOLDATA_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            cache_max_age_days: std::env::var("CACHE_MAX_AGE_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_age_days),
        }
    }
}

/// Per-user cache location, falling back to the working directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scschooldata")
}
