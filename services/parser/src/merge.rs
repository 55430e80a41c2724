use crate::headcount::HeadcountFile;
use crate::model::{EnrollmentRecord, EntityLevel, EntityType, GradeLevel, Subgroup};
use tracing::{debug, warn};

/// Join a grade file with its (optional) demographic file into wide rows.
///
/// Left join on entity ID: the grade file decides which entities exist,
/// demographic-only entities are dropped, and entities with no demographic
/// row keep `None` in every demographic column. School rows get
/// `district_id` from the first three digits of the school ID.
pub fn merge_entities(
    grade: &HeadcountFile,
    demo: Option<&HeadcountFile>,
    end_year: i32,
) -> Vec<EnrollmentRecord> {
    let demo_index = demo.map(HeadcountFile::by_id).unwrap_or_default();

    if demo.is_none() {
        warn!(entity_level = %grade.level, end_year, "no demographic file, demographic columns left missing");
    }

    let mut unmatched = 0usize;
    let mut records = Vec::with_capacity(grade.rows.len());

    for row in &grade.rows {
        let mut record = match grade.level {
            EntityLevel::School => {
                let mut r = EnrollmentRecord::empty(end_year, EntityType::Campus);
                r.campus_id = Some(row.entity_id.clone());
                r.district_id = row.entity_id.get(..3).map(str::to_string);
                r.campus_name = row.school_name.clone();
                r
            }
            EntityLevel::District => {
                let mut r = EnrollmentRecord::empty(end_year, EntityType::District);
                r.district_id = Some(row.entity_id.clone());
                r
            }
        };
        record.district_name = row.district_name.clone();
        record.row_total = row.count("total");

        for grade_level in GradeLevel::SINGLE {
            if let Some(column) = grade_level.column() {
                if let Some(slot) = record.count_mut(column) {
                    *slot = row.count(column);
                }
            }
        }

        match demo_index.get(row.entity_id.as_str()) {
            Some(demo_row) => {
                for subgroup in Subgroup::DEMOGRAPHIC {
                    let column = subgroup.column();
                    if let Some(slot) = record.count_mut(column) {
                        *slot = demo_row.count(column);
                    }
                }
                if record.district_name.is_none() {
                    record.district_name = demo_row.district_name.clone();
                }
                if record.entity_type == EntityType::Campus && record.campus_name.is_none() {
                    record.campus_name = demo_row.school_name.clone();
                }
            }
            None => unmatched += 1,
        }

        records.push(record);
    }

    if demo.is_some() && unmatched > 0 {
        debug!(entity_level = %grade.level, end_year, unmatched, "entities without demographic rows");
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headcount::parse_headcount_grid;
    use crate::model::DataKind;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn school_grade() -> HeadcountFile {
        let g = grid(&[
            &["School ID", "District", "School", "Total", "PK", "K", "1"],
            &[],
            &["1560001", "Sample County 1", "Sample Elementary", "500", "10", "40", "45"],
            &["1560002", "Sample County 1", "Sample Middle", "300", "", "", ""],
        ]);
        parse_headcount_grid(&g, EntityLevel::School, DataKind::Grade).unwrap()
    }

    fn school_demo() -> HeadcountFile {
        let g = grid(&[
            &[
                "School ID", "District", "School", "Total", "Female", "Male", "Missing", "Black",
                "AmInd", "Asian", "Hispanic", "PacIsl", "Multi", "White", "Pupils in Poverty",
            ],
            &[],
            &[
                "1560001", "Sample County 1", "Sample Elementary", "500", "240", "260", "0", "200",
                "*", "5", "20", "*", "25", "250", "310",
            ],
            &["9990001", "Elsewhere", "Not In Grade File", "10", "5", "5"],
        ]);
        parse_headcount_grid(&g, EntityLevel::School, DataKind::Demo).unwrap()
    }

    #[test]
    fn test_merge_school_rows() {
        let records = merge_entities(&school_grade(), Some(&school_demo()), 2024);
        assert_eq!(records.len(), 2);

        let r = &records[0];
        assert_eq!(r.entity_type, EntityType::Campus);
        assert_eq!(r.end_year, 2024);
        assert_eq!(r.campus_id.as_deref(), Some("1560001"));
        assert_eq!(r.district_id.as_deref(), Some("156"));
        assert_eq!(r.campus_name.as_deref(), Some("Sample Elementary"));
        assert_eq!(r.row_total, Some(500.0));
        assert_eq!(r.grade_k, Some(40.0));
        assert_eq!(r.black, Some(200.0));
        assert_eq!(r.white, Some(250.0));
        assert_eq!(r.native_american, None);
        assert_eq!(r.econ_disadv, Some(310.0));
        assert_eq!(r.female, Some(240.0));
    }

    #[test]
    fn test_demo_only_entities_dropped() {
        let records = merge_entities(&school_grade(), Some(&school_demo()), 2024);
        assert!(records.iter().all(|r| r.campus_id.as_deref() != Some("9990001")));
    }

    #[test]
    fn test_missing_demo_row_leaves_demographics_missing() {
        let records = merge_entities(&school_grade(), Some(&school_demo()), 2024);
        let r = &records[1];
        assert_eq!(r.campus_id.as_deref(), Some("1560002"));
        assert_eq!(r.row_total, Some(300.0));
        assert_eq!(r.black, None);
        assert_eq!(r.male, None);
    }

    #[test]
    fn test_missing_demo_file() {
        let records = merge_entities(&school_grade(), None, 2024);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.white.is_none() && r.econ_disadv.is_none()));
    }

    #[test]
    fn test_placeholders_always_missing() {
        let records = merge_entities(&school_grade(), Some(&school_demo()), 2024);
        for r in &records {
            assert!(r.lep.is_none());
            assert!(r.special_ed.is_none());
            assert!(r.charter_flag.is_none());
            assert!(r.county.is_none());
            assert!(r.region.is_none());
        }
    }

    #[test]
    fn test_merge_district_rows() {
        let g = grid(&[
            &["District", "Name", "Total", "PK", "K"],
            &[],
            &["156", "Sample County 1", "9,000", "300", "700"],
            &["900", "Charter District", "4,000", "", "350"],
        ]);
        let grade = parse_headcount_grid(&g, EntityLevel::District, DataKind::Grade).unwrap();
        let records = merge_entities(&grade, None, 2023);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].entity_type, EntityType::District);
        assert_eq!(records[0].district_id.as_deref(), Some("156"));
        assert_eq!(records[0].campus_id, None);
        assert_eq!(records[0].campus_name, None);
        assert_eq!(records[0].row_total, Some(9000.0));
        assert!(records[1].is_charter());
    }
}
