//! Domain types shared by the parser, collector and enrollment services.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// District code of the statewide charter school district.
pub const CHARTER_DISTRICT_ID: &str = "900";

/// Granularity of a headcount file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityLevel {
    School,
    District,
}

impl EntityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLevel::School => "school",
            EntityLevel::District => "district",
        }
    }

    /// School IDs are exactly 7 digits, district IDs 3 or 4 digits.
    pub fn is_valid_id(&self, id: &str) -> bool {
        let digits = id.chars().all(|c| c.is_ascii_digit());
        match self {
            EntityLevel::School => digits && id.len() == 7,
            EntityLevel::District => digits && (3..=4).contains(&id.len()),
        }
    }
}

impl fmt::Display for EntityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "school" | "campus" => Ok(EntityLevel::School),
            "district" => Ok(EntityLevel::District),
            other => Err(format!("unknown entity level '{}' (expected school or district)", other)),
        }
    }
}

/// Which headcount breakdown a file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Counts by grade level
    Grade,
    /// Counts by gender, ethnicity and poverty status
    Demo,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Grade => "grade",
            DataKind::Demo => "demo",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grade" => Ok(DataKind::Grade),
            "demo" | "demographic" | "demographics" => Ok(DataKind::Demo),
            other => Err(format!("unknown data kind '{}' (expected grade or demo)", other)),
        }
    }
}

/// Aggregation level of an output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    State,
    District,
    Campus,
}

/// Grade level of a tidy row. Single grades map onto wide columns; the
/// bands (`K8`, `HS`, `K12`) only appear in grade aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeLevel {
    #[serde(rename = "TOTAL")]
    Total,
    #[serde(rename = "PK")]
    Pk,
    #[serde(rename = "K")]
    K,
    #[serde(rename = "01")]
    G01,
    #[serde(rename = "02")]
    G02,
    #[serde(rename = "03")]
    G03,
    #[serde(rename = "04")]
    G04,
    #[serde(rename = "05")]
    G05,
    #[serde(rename = "06")]
    G06,
    #[serde(rename = "07")]
    G07,
    #[serde(rename = "08")]
    G08,
    #[serde(rename = "09")]
    G09,
    #[serde(rename = "10")]
    G10,
    #[serde(rename = "11")]
    G11,
    #[serde(rename = "12")]
    G12,
    #[serde(rename = "K8")]
    K8,
    #[serde(rename = "HS")]
    Hs,
    #[serde(rename = "K12")]
    K12,
}

impl GradeLevel {
    /// The fourteen single grades, in wide-column order.
    pub const SINGLE: [GradeLevel; 14] = [
        GradeLevel::Pk,
        GradeLevel::K,
        GradeLevel::G01,
        GradeLevel::G02,
        GradeLevel::G03,
        GradeLevel::G04,
        GradeLevel::G05,
        GradeLevel::G06,
        GradeLevel::G07,
        GradeLevel::G08,
        GradeLevel::G09,
        GradeLevel::G10,
        GradeLevel::G11,
        GradeLevel::G12,
    ];

    pub const BANDS: [GradeLevel; 3] = [GradeLevel::K8, GradeLevel::Hs, GradeLevel::K12];

    pub fn as_str(&self) -> &'static str {
        match self {
            GradeLevel::Total => "TOTAL",
            GradeLevel::Pk => "PK",
            GradeLevel::K => "K",
            GradeLevel::G01 => "01",
            GradeLevel::G02 => "02",
            GradeLevel::G03 => "03",
            GradeLevel::G04 => "04",
            GradeLevel::G05 => "05",
            GradeLevel::G06 => "06",
            GradeLevel::G07 => "07",
            GradeLevel::G08 => "08",
            GradeLevel::G09 => "09",
            GradeLevel::G10 => "10",
            GradeLevel::G11 => "11",
            GradeLevel::G12 => "12",
            GradeLevel::K8 => "K8",
            GradeLevel::Hs => "HS",
            GradeLevel::K12 => "K12",
        }
    }

    /// Wide column holding this grade's count, for single grades only.
    pub fn column(&self) -> Option<&'static str> {
        Some(match self {
            GradeLevel::Pk => "grade_pk",
            GradeLevel::K => "grade_k",
            GradeLevel::G01 => "grade_01",
            GradeLevel::G02 => "grade_02",
            GradeLevel::G03 => "grade_03",
            GradeLevel::G04 => "grade_04",
            GradeLevel::G05 => "grade_05",
            GradeLevel::G06 => "grade_06",
            GradeLevel::G07 => "grade_07",
            GradeLevel::G08 => "grade_08",
            GradeLevel::G09 => "grade_09",
            GradeLevel::G10 => "grade_10",
            GradeLevel::G11 => "grade_11",
            GradeLevel::G12 => "grade_12",
            GradeLevel::Total | GradeLevel::K8 | GradeLevel::Hs | GradeLevel::K12 => return None,
        })
    }

    /// Single grades summed into a band. Empty for anything that is not a band.
    pub fn band_members(&self) -> &'static [GradeLevel] {
        use GradeLevel::*;
        match self {
            K8 => &[K, G01, G02, G03, G04, G05, G06, G07, G08],
            Hs => &[G09, G10, G11, G12],
            K12 => &[K, G01, G02, G03, G04, G05, G06, G07, G08, G09, G10, G11, G12],
            _ => &[],
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Population a tidy row counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subgroup {
    TotalEnrollment,
    White,
    Black,
    Hispanic,
    Asian,
    NativeAmerican,
    PacificIslander,
    Multiracial,
    Female,
    Male,
    EconDisadv,
}

impl Subgroup {
    /// Subgroups reported as their own wide column.
    pub const DEMOGRAPHIC: [Subgroup; 10] = [
        Subgroup::White,
        Subgroup::Black,
        Subgroup::Hispanic,
        Subgroup::Asian,
        Subgroup::NativeAmerican,
        Subgroup::PacificIslander,
        Subgroup::Multiracial,
        Subgroup::Female,
        Subgroup::Male,
        Subgroup::EconDisadv,
    ];

    /// Wide column name. `total_enrollment` reads from `row_total`.
    pub fn column(&self) -> &'static str {
        match self {
            Subgroup::TotalEnrollment => "row_total",
            Subgroup::White => "white",
            Subgroup::Black => "black",
            Subgroup::Hispanic => "hispanic",
            Subgroup::Asian => "asian",
            Subgroup::NativeAmerican => "native_american",
            Subgroup::PacificIslander => "pacific_islander",
            Subgroup::Multiracial => "multiracial",
            Subgroup::Female => "female",
            Subgroup::Male => "male",
            Subgroup::EconDisadv => "econ_disadv",
        }
    }
}

/// Wide columns that hold counts and are summed into the state row.
pub const COUNT_COLUMNS: [&str; 25] = [
    "row_total",
    "grade_pk",
    "grade_k",
    "grade_01",
    "grade_02",
    "grade_03",
    "grade_04",
    "grade_05",
    "grade_06",
    "grade_07",
    "grade_08",
    "grade_09",
    "grade_10",
    "grade_11",
    "grade_12",
    "white",
    "black",
    "hispanic",
    "asian",
    "native_american",
    "pacific_islander",
    "multiracial",
    "female",
    "male",
    "econ_disadv",
];

/// One wide enrollment row per (end_year, level, entity).
///
/// `row_total` is the reported total and is not reconciled against the grade
/// or demographic columns. `lep`, `special_ed`, `charter_flag`, `county` and
/// `region` are not published in the headcount files and stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub end_year: i32,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub district_id: Option<String>,
    pub campus_id: Option<String>,
    pub district_name: Option<String>,
    pub campus_name: Option<String>,
    pub row_total: Option<f64>,
    pub grade_pk: Option<f64>,
    pub grade_k: Option<f64>,
    pub grade_01: Option<f64>,
    pub grade_02: Option<f64>,
    pub grade_03: Option<f64>,
    pub grade_04: Option<f64>,
    pub grade_05: Option<f64>,
    pub grade_06: Option<f64>,
    pub grade_07: Option<f64>,
    pub grade_08: Option<f64>,
    pub grade_09: Option<f64>,
    pub grade_10: Option<f64>,
    pub grade_11: Option<f64>,
    pub grade_12: Option<f64>,
    pub white: Option<f64>,
    pub black: Option<f64>,
    pub hispanic: Option<f64>,
    pub asian: Option<f64>,
    pub native_american: Option<f64>,
    pub pacific_islander: Option<f64>,
    pub multiracial: Option<f64>,
    pub female: Option<f64>,
    pub male: Option<f64>,
    pub econ_disadv: Option<f64>,
    pub lep: Option<f64>,
    pub special_ed: Option<f64>,
    pub charter_flag: Option<String>,
    pub county: Option<String>,
    pub region: Option<String>,
}

impl EnrollmentRecord {
    /// A row with identity set and every other column missing.
    pub fn empty(end_year: i32, entity_type: EntityType) -> Self {
        Self {
            end_year,
            entity_type,
            district_id: None,
            campus_id: None,
            district_name: None,
            campus_name: None,
            row_total: None,
            grade_pk: None,
            grade_k: None,
            grade_01: None,
            grade_02: None,
            grade_03: None,
            grade_04: None,
            grade_05: None,
            grade_06: None,
            grade_07: None,
            grade_08: None,
            grade_09: None,
            grade_10: None,
            grade_11: None,
            grade_12: None,
            white: None,
            black: None,
            hispanic: None,
            asian: None,
            native_american: None,
            pacific_islander: None,
            multiracial: None,
            female: None,
            male: None,
            econ_disadv: None,
            lep: None,
            special_ed: None,
            charter_flag: None,
            county: None,
            region: None,
        }
    }

    /// Count stored under a wide column name (see [`COUNT_COLUMNS`]).
    pub fn count(&self, column: &str) -> Option<f64> {
        match column {
            "row_total" => self.row_total,
            "grade_pk" => self.grade_pk,
            "grade_k" => self.grade_k,
            "grade_01" => self.grade_01,
            "grade_02" => self.grade_02,
            "grade_03" => self.grade_03,
            "grade_04" => self.grade_04,
            "grade_05" => self.grade_05,
            "grade_06" => self.grade_06,
            "grade_07" => self.grade_07,
            "grade_08" => self.grade_08,
            "grade_09" => self.grade_09,
            "grade_10" => self.grade_10,
            "grade_11" => self.grade_11,
            "grade_12" => self.grade_12,
            "white" => self.white,
            "black" => self.black,
            "hispanic" => self.hispanic,
            "asian" => self.asian,
            "native_american" => self.native_american,
            "pacific_islander" => self.pacific_islander,
            "multiracial" => self.multiracial,
            "female" => self.female,
            "male" => self.male,
            "econ_disadv" => self.econ_disadv,
            "lep" => self.lep,
            "special_ed" => self.special_ed,
            _ => None,
        }
    }

    /// Mutable slot for a wide count column; `None` for unknown names.
    pub fn count_mut(&mut self, column: &str) -> Option<&mut Option<f64>> {
        Some(match column {
            "row_total" => &mut self.row_total,
            "grade_pk" => &mut self.grade_pk,
            "grade_k" => &mut self.grade_k,
            "grade_01" => &mut self.grade_01,
            "grade_02" => &mut self.grade_02,
            "grade_03" => &mut self.grade_03,
            "grade_04" => &mut self.grade_04,
            "grade_05" => &mut self.grade_05,
            "grade_06" => &mut self.grade_06,
            "grade_07" => &mut self.grade_07,
            "grade_08" => &mut self.grade_08,
            "grade_09" => &mut self.grade_09,
            "grade_10" => &mut self.grade_10,
            "grade_11" => &mut self.grade_11,
            "grade_12" => &mut self.grade_12,
            "white" => &mut self.white,
            "black" => &mut self.black,
            "hispanic" => &mut self.hispanic,
            "asian" => &mut self.asian,
            "native_american" => &mut self.native_american,
            "pacific_islander" => &mut self.pacific_islander,
            "multiracial" => &mut self.multiracial,
            "female" => &mut self.female,
            "male" => &mut self.male,
            "econ_disadv" => &mut self.econ_disadv,
            "lep" => &mut self.lep,
            "special_ed" => &mut self.special_ed,
            _ => return None,
        })
    }

    pub fn is_charter(&self) -> bool {
        self.district_id.as_deref() == Some(CHARTER_DISTRICT_ID)
    }
}

/// One long-format row per (entity-year, grade_level, subgroup).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidyRecord {
    pub end_year: i32,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub district_id: Option<String>,
    pub campus_id: Option<String>,
    pub district_name: Option<String>,
    pub campus_name: Option<String>,
    pub grade_level: GradeLevel,
    pub subgroup: Subgroup,
    pub n_students: f64,
    /// Share of the entity's `row_total`, 0-1 scale
    pub pct: Option<f64>,
    pub is_state: bool,
    pub is_district: bool,
    pub is_campus: bool,
    pub is_charter: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_school_id_format() {
        assert!(EntityLevel::School.is_valid_id("1560001"));
        assert!(!EntityLevel::School.is_valid_id("156001"));
        assert!(!EntityLevel::School.is_valid_id("15600011"));
        assert!(!EntityLevel::School.is_valid_id("156000A"));
        assert!(!EntityLevel::School.is_valid_id(""));
    }

    #[test]
    fn test_district_id_format() {
        assert!(EntityLevel::District.is_valid_id("156"));
        assert!(EntityLevel::District.is_valid_id("0101"));
        assert!(!EntityLevel::District.is_valid_id("12"));
        assert!(!EntityLevel::District.is_valid_id("12345"));
        assert!(!EntityLevel::District.is_valid_id("Total"));
    }

    #[test]
    fn test_every_count_column_has_a_slot() {
        let mut record = EnrollmentRecord::empty(2024, EntityType::District);
        for column in COUNT_COLUMNS {
            let slot = record.count_mut(column).unwrap();
            *slot = Some(1.0);
            assert_eq!(record.count(column), Some(1.0), "column {}", column);
        }
        assert!(record.count_mut("not_a_column").is_none());
    }

    #[test]
    fn test_band_members_are_single_grades() {
        for band in GradeLevel::BANDS {
            assert!(!band.band_members().is_empty());
            for grade in band.band_members() {
                assert!(grade.column().is_some());
            }
        }
        assert_eq!(GradeLevel::K12.band_members().len(), 13);
        assert!(GradeLevel::G05.band_members().is_empty());
    }

    #[test]
    fn test_level_and_kind_from_str() {
        assert_eq!("School".parse::<EntityLevel>().unwrap(), EntityLevel::School);
        assert_eq!("district".parse::<EntityLevel>().unwrap(), EntityLevel::District);
        assert_eq!("demo".parse::<DataKind>().unwrap(), DataKind::Demo);
        assert!("state".parse::<EntityLevel>().is_err());
        assert!("ethnicity".parse::<DataKind>().is_err());
    }

    #[test]
    fn test_grade_level_serializes_as_label() {
        let json = serde_json::to_string(&GradeLevel::G01).unwrap();
        assert_eq!(json, "\"01\"");
        let json = serde_json::to_string(&Subgroup::NativeAmerican).unwrap();
        assert_eq!(json, "\"native_american\"");
    }
}
