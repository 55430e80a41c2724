//! Report card data files.
//!
//! Unlike the headcount files these carry a single header row whose labels
//! are usable as column names, and mix numeric measures with text ratings.

use crate::error::ParseError;
use crate::grid::read_grid;
use crate::headcount::HEADER_SCAN_ROWS;
use crate::model::{EntityLevel, EntityType};
use crate::normalize::{normalize_count, SUPPRESSION_TOKENS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

const ID_HEADERS: &[&str] = &["school_id", "schoolid"];

/// One school or district row of a report card file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCardRecord {
    pub end_year: i32,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub district_id: Option<String>,
    pub campus_id: Option<String>,
    pub district_name: Option<String>,
    pub campus_name: Option<String>,
    /// Numeric measures; suppressed cells are `None`
    pub values: BTreeMap<String, Option<f64>>,
    /// Non-numeric cells such as ratings
    pub labels: BTreeMap<String, String>,
}

/// Parse report card bytes (first sheet).
pub fn parse_report_card(bytes: &[u8], end_year: i32) -> Result<Vec<ReportCardRecord>, ParseError> {
    let grid = read_grid(bytes, 0, 0, None)?;
    parse_report_card_grid(&grid, end_year)
}

pub fn parse_report_card_grid(
    grid: &[Vec<String>],
    end_year: i32,
) -> Result<Vec<ReportCardRecord>, ParseError> {
    let header_row = grid
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| {
            row.first()
                .map(|cell| ID_HEADERS.contains(&snake_case(cell).as_str()))
                .unwrap_or(false)
        })
        .ok_or(ParseError::MissingReportCardHeader {
            scanned: HEADER_SCAN_ROWS,
        })?;

    let names = header_names(&grid[header_row]);
    let district_name_col = names
        .iter()
        .position(|n| n.contains("district") && n.contains("name"));
    let school_name_col = names
        .iter()
        .position(|n| n.contains("school") && n.contains("name"));

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for row in &grid[header_row + 1..] {
        let id = row.first().map(|c| c.trim()).unwrap_or("");
        let (entity_type, district_id, campus_id) = if EntityLevel::School.is_valid_id(id) {
            (EntityType::Campus, Some(id[..3].to_string()), Some(id.to_string()))
        } else if EntityLevel::District.is_valid_id(id) {
            (EntityType::District, Some(id.to_string()), None)
        } else {
            if row.iter().any(|c| !c.trim().is_empty()) {
                dropped += 1;
            }
            continue;
        };

        let text_at = |col: Option<usize>| {
            col.and_then(|c| row.get(c))
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        };

        let mut values = BTreeMap::new();
        let mut labels = BTreeMap::new();
        for (idx, name) in names.iter().enumerate().skip(1) {
            if Some(idx) == district_name_col || Some(idx) == school_name_col {
                continue;
            }
            let cell = row.get(idx).map(|c| c.trim()).unwrap_or("");
            let value = normalize_count(cell);
            if value.is_none() && !SUPPRESSION_TOKENS.contains(&cell) {
                labels.insert(name.clone(), cell.to_string());
            }
            values.insert(name.clone(), value);
        }

        records.push(ReportCardRecord {
            end_year,
            entity_type,
            district_id,
            campus_id,
            district_name: text_at(district_name_col),
            campus_name: if entity_type == EntityType::Campus {
                text_at(school_name_col)
            } else {
                None
            },
            values,
            labels,
        });
    }

    if dropped > 0 {
        warn!(end_year, dropped, kept = records.len(), "report card rows without a well-formed ID");
    }

    Ok(records)
}

/// Header labels as unique snake_case names; blanks become `col_<n>`.
fn header_names(header: &[String]) -> Vec<String> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, label)| {
            let base = match snake_case(label) {
                s if s.is_empty() => format!("col_{}", idx + 1),
                s => s,
            };
            let n = seen.entry(base.clone()).or_insert(0);
            *n += 1;
            if *n == 1 {
                base
            } else {
                format!("{}_{}", base, n)
            }
        })
        .collect()
}

fn snake_case(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
