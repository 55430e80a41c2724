//! Candidate download URLs for SC headcount and report card files.
//!
//! The agency has renamed these files repeatedly and without notice, so the
//! resolver does not guess one URL: it expands every known naming pattern
//! for a request, most likely first, and the fetcher walks the list.
//!
//! Patterns are plain data. A newly discovered name is one more template in
//! the era, override or fallback table that covers it.

use headcount_parser::{DataKind, EntityLevel};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

pub const HEADCOUNT_BASE_URL: &str =
    "https://ed.sc.gov/data/other/student-counts/active-student-headcounts";
pub const REPORT_CARD_BASE_URL: &str = "https://screportcards.ed.sc.gov/files";

/// End years with published headcount files.
pub const HEADCOUNT_YEARS: RangeInclusive<i32> = 2013..=2026;
/// End years with published report card data files.
pub const REPORT_CARD_YEARS: RangeInclusive<i32> = 2018..=2025;

const FOLDER_PLURAL: &str = "active-student-headcounts";
const FOLDER_SINGULAR: &str = "active-student-headcount";

/// Day of the school year the headcount was taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CountDay {
    #[default]
    #[serde(rename = "45")]
    Day45,
    #[serde(rename = "135")]
    Day135,
    #[serde(rename = "180")]
    Day180,
}

impl CountDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            CountDay::Day45 => "45",
            CountDay::Day135 => "135",
            CountDay::Day180 => "180",
        }
    }

    /// "45th", "135th", "180th"
    pub fn ordinal(&self) -> String {
        format!("{}th", self.as_str())
    }
}

impl fmt::Display for CountDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "45" => Ok(CountDay::Day45),
            "135" => Ok(CountDay::Day135),
            "180" => Ok(CountDay::Day180),
            other => Err(format!("invalid count day '{}' (expected 45, 135 or 180)", other)),
        }
    }
}

/// One headcount file to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadcountRequest {
    pub end_year: i32,
    pub level: EntityLevel,
    pub kind: DataKind,
    pub count_day: CountDay,
}

impl HeadcountRequest {
    pub fn new(end_year: i32, level: EntityLevel, kind: DataKind, count_day: CountDay) -> Self {
        Self {
            end_year,
            level,
            kind,
            count_day,
        }
    }

    /// Human-readable name used in logs and errors, e.g. "2024 school grade (45-day)".
    pub fn label(&self) -> String {
        format!("{} {} {} ({}-day)", self.end_year, self.level, self.kind, self.count_day)
    }
}

/// Patterns that were the primary naming scheme for a span of years.
struct Era {
    years: RangeInclusive<i32>,
    grade: &'static [&'static str],
    demo: &'static [&'static str],
}

const ERAS: &[Era] = &[
    Era {
        years: 2024..=2026,
        grade: &["{base}/{sy}-{folder}/{cd}-day-{level}-headcount-by-grade/"],
        demo: &["{base}/{sy}-{folder}/{cd}-day-{level}-headcount-by-gender-ethnicity-and-pupils-in-poverty/"],
    },
    Era {
        years: 2021..=2023,
        grade: &["{base}/{sy}-{folder}/{level}-headcount-by-grade-{cd}-day/"],
        demo: &["{base}/{sy}-{folder}/{level}-headcount-by-gender-ethnicity-and-pupils-in-poverty-{cd}-day/"],
    },
    Era {
        years: 2013..=2020,
        grade: &["{base}/{sy}-{folder}/{nth}-day-{level}-headcount-by-grade/"],
        demo: &["{base}/{sy}-{folder}/{nth}-day-{level}-headcount-by-gender-and-ethnicity/"],
    },
];

/// Single files whose name deviates from their era, tried before the era.
struct Override {
    years: RangeInclusive<i32>,
    level: EntityLevel,
    kind: DataKind,
    count_day: CountDay,
    templates: &'static [&'static str],
}

const OVERRIDES: &[Override] = &[Override {
    // Suffixed to avoid clashing with another upload of the same name
    years: 2021..=2023,
    level: EntityLevel::District,
    kind: DataKind::Grade,
    count_day: CountDay::Day180,
    templates: &["{base}/{sy}-{folder}/{level}-headcount-by-grade-{cd}-day1/"],
}];

const GRADE_SLUGS: &[&str] = &["headcount-by-grade"];

const DEMO_SLUGS: &[&str] = &[
    "headcount-by-gender-ethnicity-and-pupils-in-poverty",
    "headcount-by-gender-and-ethnicity",
    "headcount-by-gender-ethnicity-and-poverty",
];

/// Spellings seen across years, expanded for every slug of the data kind.
const FALLBACKS: &[&str] = &[
    "{base}/{sy}-{folder}/{cd}-day-{level}-{slug}/",
    "{base}/{sy}-{folder}/{nth}-day-{level}-{slug}/",
    "{base}/{sy}-{folder}/{level}-{slug}-{cd}-day/",
    "{base}/{sy}-{folder}/{level}-{slug}-{nth}-day/",
    "{base}/{sy}-{folder}/{nth}-day-{level}-{slug}-xlsx/",
    "{base}/{sy}-{folder}/{nth}-day-{level}-{slug}-xls/",
    "{base}/{sy}-{folder}/{cd}-day-{level}-{slug}-xlsx/",
    "{base}/{sy}-{folder}/{cd}-day-{level}-{slug}-xls/",
    "{base}/{sy}-{folder}/{Nth}-Day-{Level}-{Slug}/",
    "{base}/{sy}-{folder}/{nth}_day_{level}_{slug_}/",
    "{base}/{sy}-{folder}/{syc}-{nth}-day-{level}-{slug}/",
    "{base}/{sy}-{folder}/{sys}-{nth}-day-{level}-{slug}/",
    "{base}/{sy}-{folder}/{level}-{slug}-{syc}/",
    "{base}/{syc}-{folder}/{nth}-day-{level}-{slug}/",
];

const REPORT_CARD_TEMPLATES: &[&str] = &[
    "{base}/{year}/data-files/{year}-report-card-data-files.xlsx",
    "{base}/{year}/data-files/report-card-data-{year}.xlsx",
    "{base}/{year}/data-files/{syc}-report-card-data.xlsx",
    "{base}/{year}/data-files/{year}-report-card-data-files.xls",
];

/// "2023-24" for end year 2024.
pub fn school_year_label(end_year: i32) -> String {
    format!("{}-{:02}", end_year - 1, end_year.rem_euclid(100))
}

/// "202324" for end year 2024.
pub fn compact_school_year(end_year: i32) -> String {
    format!("{}{:02}", end_year - 1, end_year.rem_euclid(100))
}

/// "2324" for end year 2024.
fn short_school_year(end_year: i32) -> String {
    format!("{:02}{:02}", (end_year - 1).rem_euclid(100), end_year.rem_euclid(100))
}

/// 2017 files sit in a singular folder; its plural twin is tried second.
fn folders(end_year: i32) -> &'static [&'static str] {
    if end_year == 2017 {
        &[FOLDER_SINGULAR, FOLDER_PLURAL]
    } else {
        &[FOLDER_PLURAL]
    }
}

/// Every known URL for `request`, most likely first, without duplicates.
/// Years outside [`HEADCOUNT_YEARS`] have no candidates.
pub fn headcount_candidates(base: &str, request: &HeadcountRequest) -> Vec<String> {
    if !HEADCOUNT_YEARS.contains(&request.end_year) {
        return Vec::new();
    }

    let base = base.trim_end_matches('/');
    let vars = Vars::new(base, request);
    let folders = folders(request.end_year);

    let overrides = OVERRIDES
        .iter()
        .filter(|o| {
            o.years.contains(&request.end_year)
                && o.level == request.level
                && o.kind == request.kind
                && o.count_day == request.count_day
        })
        .flat_map(|o| o.templates.iter());

    let primaries = ERAS
        .iter()
        .filter(|era| era.years.contains(&request.end_year))
        .flat_map(|era| match request.kind {
            DataKind::Grade => era.grade.iter(),
            DataKind::Demo => era.demo.iter(),
        });

    let slugs = match request.kind {
        DataKind::Grade => GRADE_SLUGS,
        DataKind::Demo => DEMO_SLUGS,
    };

    let mut urls = Vec::new();
    for template in overrides.chain(primaries) {
        for folder in folders {
            urls.push(vars.expand(template, folder, ""));
        }
    }
    for template in FALLBACKS {
        for folder in folders {
            for slug in slugs {
                urls.push(vars.expand(template, folder, slug));
            }
        }
    }

    dedupe(urls)
}

/// Candidate URLs for a report card data file.
pub fn report_card_candidates(base: &str, end_year: i32) -> Vec<String> {
    if !REPORT_CARD_YEARS.contains(&end_year) {
        return Vec::new();
    }
    let base = base.trim_end_matches('/');
    let urls = REPORT_CARD_TEMPLATES
        .iter()
        .map(|t| {
            t.replace("{base}", base)
                .replace("{year}", &end_year.to_string())
                .replace("{syc}", &compact_school_year(end_year))
        })
        .collect();
    dedupe(urls)
}

struct Vars {
    base: String,
    sy: String,
    syc: String,
    sys: String,
    cd: &'static str,
    nth: String,
    level: &'static str,
}

impl Vars {
    fn new(base: &str, request: &HeadcountRequest) -> Self {
        Self {
            base: base.to_string(),
            sy: school_year_label(request.end_year),
            syc: compact_school_year(request.end_year),
            sys: short_school_year(request.end_year),
            cd: request.count_day.as_str(),
            nth: request.count_day.ordinal(),
            level: request.level.as_str(),
        }
    }

    fn expand(&self, template: &str, folder: &str, slug: &str) -> String {
        template
            .replace("{base}", &self.base)
            .replace("{sy}", &self.sy)
            .replace("{syc}", &self.syc)
            .replace("{sys}", &self.sys)
            .replace("{folder}", folder)
            .replace("{cd}", self.cd)
            .replace("{nth}", &self.nth)
            .replace("{Nth}", &self.nth)
            .replace("{level}", self.level)
            .replace("{Level}", &title_case(self.level))
            .replace("{slug}", slug)
            .replace("{slug_}", &slug.replace('-', "_"))
            .replace("{Slug}", &title_case(slug))
    }
}

/// "headcount-by-grade" -> "Headcount-By-Grade"
fn title_case(slug: &str) -> String {
    slug.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn dedupe(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.into_iter().filter(|u| seen.insert(u.clone())).collect()
}
