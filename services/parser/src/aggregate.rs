use crate::model::{EnrollmentRecord, EntityType, COUNT_COLUMNS};

/// Sum district rows into the single state row for `end_year`.
///
/// Missing counts are skipped rather than propagated, so a year with a few
/// suppressed district cells still produces a usable state total. Identity
/// columns, `lep` and `special_ed` stay missing.
pub fn state_total(districts: &[EnrollmentRecord], end_year: i32) -> EnrollmentRecord {
    let mut state = EnrollmentRecord::empty(end_year, EntityType::State);

    for column in COUNT_COLUMNS {
        let total: f64 = districts
            .iter()
            .filter(|r| r.entity_type == EntityType::District)
            .filter_map(|r| r.count(column))
            .sum();
        if let Some(slot) = state.count_mut(column) {
            *slot = Some(total);
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn district(id: &str, total: Option<f64>, black: Option<f64>) -> EnrollmentRecord {
        let mut r = EnrollmentRecord::empty(2024, EntityType::District);
        r.district_id = Some(id.to_string());
        r.district_name = Some(format!("District {}", id));
        r.row_total = total;
        r.black = black;
        r.grade_k = Some(10.0);
        r
    }

    #[test]
    fn test_state_total_sums_districts() {
        let districts = vec![
            district("156", Some(9000.0), Some(3000.0)),
            district("0402", Some(3000.0), Some(1000.0)),
            district("900", Some(4000.0), None),
        ];
        let state = state_total(&districts, 2024);

        assert_eq!(state.entity_type, EntityType::State);
        assert_eq!(state.end_year, 2024);
        assert_eq!(state.row_total, Some(16000.0));
        assert_eq!(state.black, Some(4000.0));
        assert_eq!(state.grade_k, Some(30.0));
    }

    #[test]
    fn test_state_total_treats_missing_as_zero() {
        let districts = vec![district("156", Some(100.0), None), district("157", None, None)];
        let state = state_total(&districts, 2024);
        let expected: f64 = districts.iter().map(|d| d.row_total.unwrap_or(0.0)).sum();
        assert_eq!(state.row_total, Some(expected));
        assert_eq!(state.black, Some(0.0));
    }

    #[test]
    fn test_state_identity_columns_missing() {
        let state = state_total(&[district("156", Some(1.0), None)], 2024);
        assert!(state.district_id.is_none());
        assert!(state.campus_id.is_none());
        assert!(state.district_name.is_none());
        assert!(state.campus_name.is_none());
        assert!(state.county.is_none());
        assert!(state.region.is_none());
        assert!(state.charter_flag.is_none());
        assert!(state.lep.is_none());
        assert!(state.special_ed.is_none());
    }

    #[test]
    fn test_campus_rows_are_not_counted() {
        let mut campus = EnrollmentRecord::empty(2024, EntityType::Campus);
        campus.row_total = Some(500.0);
        let state = state_total(&[district("156", Some(100.0), None), campus], 2024);
        assert_eq!(state.row_total, Some(100.0));
    }
}
