//! On-disk table cache, one JSON file per (end year, tag).
//!
//! Entries are replaced wholesale on write and never patched. Single process,
//! single writer.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

const PREFIX: &str = "enr_";
const EXTENSION: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub end_year: i32,
    /// `wide`, `tidy`, `reportcards`, count-day variants like `tidy_d135`,
    /// or any caller-chosen tag
    pub tag: String,
}

impl CacheKey {
    pub fn new(end_year: i32, tag: impl Into<String>) -> Self {
        Self {
            end_year,
            tag: tag.into(),
        }
    }

    /// Tags are percent-encoded so any tag maps to a single file inside the
    /// cache directory.
    fn file_name(&self) -> String {
        format!("{}{}_{}{}", PREFIX, encode_tag(&self.tag), self.end_year, EXTENSION)
    }

    /// Inverse of `file_name`. Tags may themselves contain underscores, so
    /// the year is taken from the last segment.
    fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_prefix(PREFIX)?.strip_suffix(EXTENSION)?;
        let (tag, year) = stem.rsplit_once('_')?;
        let tag = decode_tag(tag)?;
        if tag.is_empty() {
            return None;
        }
        Some(Self::new(year.parse().ok()?, tag))
    }
}

fn encode_tag(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    for byte in tag.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_tag(encoded: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(encoded.len());
    let mut rest = encoded.as_bytes();
    while let Some((&first, tail)) = rest.split_first() {
        if first == b'%' {
            let hex = std::str::from_utf8(tail.get(..2)?).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
            rest = &tail[2..];
        } else {
            bytes.push(first);
            rest = tail;
        }
    }
    String::from_utf8(bytes).ok()
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.end_year, self.tag)
    }
}

/// One row of `status()`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
    pub age_days: f64,
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// True if the entry exists and, when `max_age` is given, is younger than it.
    pub fn exists(&self, key: &CacheKey, max_age: Option<Duration>) -> bool {
        let Ok(meta) = fs::metadata(self.path(key)) else {
            return false;
        };
        match max_age {
            None => true,
            Some(max_age) => meta
                .modified()
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())
                .map(|age| age <= max_age)
                // mtime in the future counts as fresh
                .unwrap_or(true),
        }
    }

    pub fn write<T: Serialize>(&self, key: &CacheKey, rows: &[T]) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| Error::CacheIo {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path(key);
        let json = serde_json::to_vec(rows).map_err(|source| Error::CacheFormat {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| Error::CacheIo {
            path: path.clone(),
            source,
        })?;

        debug!(key = %key, rows = rows.len(), path = %path.display(), "cache write");
        Ok(())
    }

    pub fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Vec<T>> {
        let path = self.path(key);
        let bytes = fs::read(&path).map_err(|source| Error::CacheIo {
            path: path.clone(),
            source,
        })?;
        let rows: Vec<T> =
            serde_json::from_slice(&bytes).map_err(|source| Error::CacheFormat { path, source })?;
        debug!(key = %key, rows = rows.len(), "cache hit");
        Ok(rows)
    }

    /// Remove matching entries. No filter clears everything, a year clears
    /// that year, a year and tag clear one entry. Returns the number removed.
    pub fn clear(&self, end_year: Option<i32>, tag: Option<&str>) -> Result<usize> {
        let mut removed = 0;
        for (key, path) in self.entries()? {
            if end_year.is_some_and(|y| y != key.end_year) || tag.is_some_and(|t| t != key.tag) {
                continue;
            }
            fs::remove_file(&path).map_err(|source| Error::CacheIo {
                path: path.clone(),
                source,
            })?;
            debug!(key = %key, "cache entry removed");
            removed += 1;
        }
        Ok(removed)
    }

    /// Every entry, ordered by year then tag.
    pub fn status(&self) -> Result<Vec<CacheEntry>> {
        let now = Utc::now();
        let mut entries = Vec::new();
        for (key, path) in self.entries()? {
            let meta = fs::metadata(&path).map_err(|source| Error::CacheIo {
                path: path.clone(),
                source,
            })?;
            let modified: DateTime<Utc> = meta
                .modified()
                .map(DateTime::from)
                .unwrap_or(now);
            let age_days = (now - modified).num_seconds().max(0) as f64 / 86_400.0;
            entries.push(CacheEntry {
                key,
                path,
                size_bytes: meta.len(),
                modified,
                age_days,
            });
        }
        Ok(entries)
    }

    fn entries(&self) -> Result<Vec<(CacheKey, PathBuf)>> {
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(Error::CacheIo {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut entries: Vec<(CacheKey, PathBuf)> = dir
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let key = CacheKey::from_file_name(name.to_str()?)?;
                Some((key, entry.path()))
            })
            .collect();
        entries.sort_by(|a, b| (a.0.end_year, &a.0.tag).cmp(&(b.0.end_year, &b.0.tag)));
        Ok(entries)
    }
}
