use crate::fetch::MIN_PAYLOAD_BYTES;
use crate::urls::{HEADCOUNT_BASE_URL, REPORT_CARD_BASE_URL};

/// Collector settings, read from the environment with defaults.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub headcount_base_url: String,
    pub report_card_base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub min_payload_bytes: usize,
    /// Pause before every candidate request
    pub rate_limit_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            headcount_base_url: HEADCOUNT_BASE_URL.to_string(),
            report_card_base_url: REPORT_CARD_BASE_URL.to_string(),
            timeout_secs: 120,
            user_agent: default_user_agent(),
            min_payload_bytes: MIN_PAYLOAD_BYTES,
            rate_limit_ms: 250,
        }
    }
}

impl CollectorConfig {
    /// Unset or unparseable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            headcount_base_url: std::env::var("HEADCOUNT_BASE_URL")
                .unwrap_or(defaults.headcount_base_url),
            report_card_base_url: std::env::var("REPORT_CARD_BASE_URL")
                .unwrap_or(defaults.report_card_base_url),
            timeout_secs: std::env::var("FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            user_agent: std::env::var("FETCH_USER_AGENT").unwrap_or(defaults.user_agent),
            min_payload_bytes: std::env::var("MIN_PAYLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_payload_bytes),
            rate_limit_ms: std::env::var("RATE_LIMIT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_ms),
        }
    }
}

fn default_user_agent() -> String {
    format!(
        "scschooldata/{} (+enrollment data client)",
        env!("CARGO_PKG_VERSION")
    )
}
