use crate::model::{EnrollmentRecord, EntityType, GradeLevel, Subgroup, TidyRecord, CHARTER_DISTRICT_ID};
use std::collections::HashMap;

/// Reshape wide rows into tidy rows.
///
/// Per entity-year: one `TOTAL`/`total_enrollment` row, one `TOTAL` row per
/// demographic subgroup, and one `total_enrollment` row per single grade.
/// Missing counts produce no row. `pct` divides by the entity's `row_total`
/// and is `None` when that is missing or zero.
pub fn tidy_enrollment(records: &[EnrollmentRecord]) -> Vec<TidyRecord> {
    let mut tidy = Vec::with_capacity(records.len() * 25);

    for record in records {
        let cells = std::iter::once((GradeLevel::Total, Subgroup::TotalEnrollment, record.row_total))
            .chain(
                Subgroup::DEMOGRAPHIC
                    .iter()
                    .map(|s| (GradeLevel::Total, *s, record.count(s.column()))),
            )
            .chain(GradeLevel::SINGLE.iter().map(|g| {
                let count = g.column().and_then(|c| record.count(c));
                (*g, Subgroup::TotalEnrollment, count)
            }));

        for (grade_level, subgroup, count) in cells {
            if let Some(n_students) = count {
                tidy.push(tidy_row(record, grade_level, subgroup, n_students, record.row_total));
            }
        }
    }

    tidy
}

/// Grade bands (`K8`, `HS`, `K12`) per entity-year.
///
/// Each band is the exact sum of its single-grade `total_enrollment` rows;
/// grades with no row count as zero.
pub fn grade_aggregates(tidy: &[TidyRecord]) -> Vec<TidyRecord> {
    struct Entity<'a> {
        first: &'a TidyRecord,
        row_total: Option<f64>,
        grades: HashMap<GradeLevel, f64>,
    }

    let mut order: Vec<EntityKey> = Vec::new();
    let mut entities: HashMap<EntityKey, Entity> = HashMap::new();

    for row in tidy.iter().filter(|r| r.subgroup == Subgroup::TotalEnrollment) {
        let key = EntityKey::of(row);
        let entity = entities.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Entity {
                first: row,
                row_total: None,
                grades: HashMap::new(),
            }
        });

        if row.grade_level == GradeLevel::Total {
            entity.row_total = Some(row.n_students);
        } else if row.grade_level.column().is_some() {
            *entity.grades.entry(row.grade_level).or_insert(0.0) += row.n_students;
        }
    }

    let mut bands = Vec::with_capacity(order.len() * GradeLevel::BANDS.len());
    for key in &order {
        let Some(entity) = entities.get(key) else {
            continue;
        };
        for band in GradeLevel::BANDS {
            let n_students: f64 = band
                .band_members()
                .iter()
                .map(|g| entity.grades.get(g).copied().unwrap_or(0.0))
                .sum();
            let mut row = entity.first.clone();
            row.grade_level = band;
            row.subgroup = Subgroup::TotalEnrollment;
            row.n_students = n_students;
            row.pct = share(n_students, entity.row_total);
            bands.push(row);
        }
    }

    bands
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityKey {
    end_year: i32,
    entity_type: EntityType,
    district_id: Option<String>,
    campus_id: Option<String>,
}

impl EntityKey {
    fn of(row: &TidyRecord) -> Self {
        Self {
            end_year: row.end_year,
            entity_type: row.entity_type,
            district_id: row.district_id.clone(),
            campus_id: row.campus_id.clone(),
        }
    }
}

fn tidy_row(
    record: &EnrollmentRecord,
    grade_level: GradeLevel,
    subgroup: Subgroup,
    n_students: f64,
    row_total: Option<f64>,
) -> TidyRecord {
    TidyRecord {
        end_year: record.end_year,
        entity_type: record.entity_type,
        district_id: record.district_id.clone(),
        campus_id: record.campus_id.clone(),
        district_name: record.district_name.clone(),
        campus_name: record.campus_name.clone(),
        grade_level,
        subgroup,
        n_students,
        pct: share(n_students, row_total),
        is_state: record.entity_type == EntityType::State,
        is_district: record.entity_type == EntityType::District,
        is_campus: record.entity_type == EntityType::Campus,
        is_charter: record.district_id.as_deref() == Some(CHARTER_DISTRICT_ID),
    }
}

fn share(n_students: f64, row_total: Option<f64>) -> Option<f64> {
    match row_total {
        Some(total) if total > 0.0 => Some(n_students / total),
        _ => None,
    }
}
