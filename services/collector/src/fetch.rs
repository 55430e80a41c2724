//! Spreadsheet fetcher: walks an ordered candidate list and returns the first
//! payload that looks like data.

use crate::config::CollectorConfig;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info};

/// Anything smaller is an error page, not a spreadsheet.
pub const MIN_PAYLOAD_BYTES: usize = 1000;

/// Raw HTTP response as seen by the fetcher.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP GET capability. Transport failures are reported as strings; the
/// fetcher only records them against the attempted URL.
#[allow(async_fn_in_trait)]
pub trait Download {
    async fn get(&self, url: &str) -> Result<HttpResponse, String>;
}

/// reqwest-backed [`Download`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &CollectorConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl Download for HttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let resp = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| e.to_string())?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Why a candidate URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    Status(u16),
    TooSmall { bytes: usize, min: usize },
    Transport(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Status(code) => write!(f, "HTTP {}", code),
            AttemptFailure::TooSmall { bytes, min } => {
                write!(f, "payload too small ({} bytes, need {})", bytes, min)
            }
            AttemptFailure::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub url: String,
    pub failure: AttemptFailure,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no candidate URLs for {0}")]
    NoCandidates(String),

    #[error("{label}: all {} candidate URLs failed{}", attempts.len(), summarize(attempts))]
    Exhausted { label: String, attempts: Vec<Attempt> },
}

impl FetchError {
    /// URLs that were tried, in order.
    pub fn attempted_urls(&self) -> Vec<&str> {
        match self {
            FetchError::NoCandidates(_) => Vec::new(),
            FetchError::Exhausted { attempts, .. } => attempts.iter().map(|a| a.url.as_str()).collect(),
        }
    }
}

fn summarize(attempts: &[Attempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("\n  {} ({})", a.url, a.failure))
        .collect()
}

/// A successfully downloaded file.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub url: String,
    pub bytes: Vec<u8>,
    pub content_hash: String,
    pub captured_at: DateTime<Utc>,
    /// Candidates tried, including the winning one
    pub attempts: usize,
}

impl FetchedFile {
    /// XLSX payloads are zip archives; anything else is treated as legacy XLS.
    pub fn extension(&self) -> &'static str {
        if self.bytes.starts_with(b"PK") {
            "xlsx"
        } else {
            "xls"
        }
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

/// Try each candidate in order and return the first success: a 2xx status
/// with at least `config.min_payload_bytes` of body. No retries beyond the
/// list itself.
pub async fn fetch_first<D: Download>(
    client: &D,
    label: &str,
    candidates: &[String],
    config: &CollectorConfig,
) -> Result<FetchedFile, FetchError> {
    if candidates.is_empty() {
        return Err(FetchError::NoCandidates(label.to_string()));
    }

    let mut attempts = Vec::new();
    for url in candidates {
        if config.rate_limit_ms > 0 {
            sleep(Duration::from_millis(config.rate_limit_ms)).await;
        }

        debug!(%url, "trying candidate");
        let failure = match client.get(url).await {
            Ok(resp) if !resp.is_success() => AttemptFailure::Status(resp.status),
            Ok(resp) if resp.body.len() < config.min_payload_bytes => AttemptFailure::TooSmall {
                bytes: resp.body.len(),
                min: config.min_payload_bytes,
            },
            Ok(resp) => {
                let file = FetchedFile {
                    url: url.clone(),
                    content_hash: content_hash(&resp.body),
                    bytes: resp.body,
                    captured_at: Utc::now(),
                    attempts: attempts.len() + 1,
                };
                info!(
                    label,
                    url = %file.url,
                    bytes = file.bytes.len(),
                    attempts = file.attempts,
                    hash = %file.content_hash,
                    "downloaded"
                );
                return Ok(file);
            }
            Err(msg) => AttemptFailure::Transport(msg),
        };

        debug!(%url, reason = %failure, "candidate rejected");
        attempts.push(Attempt {
            url: url.clone(),
            failure,
        });
    }

    Err(FetchError::Exhausted {
        label: label.to_string(),
        attempts,
    })
}
