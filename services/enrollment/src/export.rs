use crate::enrollment::EnrollmentTable;
use crate::error::{Error, Result};
use headcount_parser::ReportCardRecord;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => f.write_str("csv"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}' (expected csv or json)", other)),
        }
    }
}

pub fn write_table<W: Write>(table: &EnrollmentTable, format: OutputFormat, writer: W) -> Result<()> {
    match table {
        EnrollmentTable::Wide(rows) => write_rows(rows, format, writer),
        EnrollmentTable::Tidy(rows) => write_rows(rows, format, writer),
    }
}

/// Flat records only; CSV cannot hold nested fields.
pub fn write_rows<T: Serialize, W: Write>(rows: &[T], format: OutputFormat, writer: W) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            let mut csv = csv::Writer::from_writer(writer);
            for row in rows {
                csv.serialize(row)?;
            }
            csv.flush().map_err(|e| Error::Csv(e.into()))?;
            Ok(())
        }
        OutputFormat::Json => write_json(rows, writer),
    }
}

/// Report cards carry a per-file set of value columns, so CSV output takes
/// the union of columns across rows in sorted order.
pub fn write_report_cards<W: Write>(rows: &[ReportCardRecord], format: OutputFormat, writer: W) -> Result<()> {
    if format == OutputFormat::Json {
        return write_json(rows, writer);
    }

    let columns: BTreeSet<&str> = rows
        .iter()
        .flat_map(|r| r.labels.keys().chain(r.values.keys()))
        .map(String::as_str)
        .collect();

    let mut csv = csv::Writer::from_writer(writer);
    let mut header = vec!["end_year", "type", "district_id", "campus_id", "district_name", "campus_name"];
    header.extend(columns.iter().copied());
    csv.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.end_year.to_string(),
            format!("{:?}", row.entity_type),
            row.district_id.clone().unwrap_or_default(),
            row.campus_id.clone().unwrap_or_default(),
            row.district_name.clone().unwrap_or_default(),
            row.campus_name.clone().unwrap_or_default(),
        ];
        // A text label wins over the missing number it stands in for
        for column in &columns {
            let cell = match row.labels.get(*column) {
                Some(label) => label.clone(),
                None => row
                    .values
                    .get(*column)
                    .copied()
                    .flatten()
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            };
            record.push(cell);
        }
        csv.write_record(&record)?;
    }

    csv.flush().map_err(|e| Error::Csv(e.into()))?;
    Ok(())
}

fn write_json<T: Serialize, W: Write>(rows: &[T], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, rows).map_err(Error::Json)?;
    writeln!(writer).map_err(|e| Error::Json(serde_json::Error::io(e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use headcount_parser::{tidy_enrollment, EnrollmentRecord, EntityType};
    use std::collections::BTreeMap;

    fn campus() -> EnrollmentRecord {
        let mut r = EnrollmentRecord::empty(2024, EntityType::Campus);
        r.district_id = Some("156".to_string());
        r.campus_id = Some("1560001".to_string());
        r.campus_name = Some("Sample Elementary".to_string());
        r.row_total = Some(500.0);
        r.grade_k = Some(40.0);
        r
    }

    fn lines(bytes: &[u8]) -> Vec<String> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_wide_csv() {
        let mut out = Vec::new();
        write_table(&EnrollmentTable::Wide(vec![campus()]), OutputFormat::Csv, &mut out).unwrap();

        let lines = lines(&out);
        assert_eq!(lines.len(), 2);
        let header: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(&header[..3], &["end_year", "type", "district_id"]);
        assert!(header.contains(&"row_total"));
        assert!(header.contains(&"special_ed"));
        assert!(lines[1].starts_with("2024,Campus,156,1560001"));
    }

    #[test]
    fn test_tidy_csv_has_one_line_per_row() {
        let tidy = tidy_enrollment(&[campus()]);
        let mut out = Vec::new();
        write_table(&EnrollmentTable::Tidy(tidy.clone()), OutputFormat::Csv, &mut out).unwrap();

        let lines = lines(&out);
        assert_eq!(lines.len(), tidy.len() + 1);
        assert!(lines[0].contains("grade_level"));
        assert!(lines
            .iter()
            .any(|l| l.contains(",K,total_enrollment,40") && l.contains(",0.08,")));
    }

    #[test]
    fn test_json_output() {
        let mut out = Vec::new();
        write_table(&EnrollmentTable::Wide(vec![campus()]), OutputFormat::Json, &mut out).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["type"], "Campus");
        assert_eq!(value[0]["row_total"], 500.0);
        assert!(value[0]["lep"].is_null());
    }

    #[test]
    fn test_report_card_csv_union_of_columns() {
        let row = |id: &str, values: &[(&str, Option<f64>)]| ReportCardRecord {
            end_year: 2023,
            entity_type: EntityType::Campus,
            district_id: Some(id[..3].to_string()),
            campus_id: Some(id.to_string()),
            district_name: None,
            campus_name: Some(format!("School {}", id)),
            values: values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            labels: BTreeMap::from([("grade_span".to_string(), "K-5".to_string())]),
        };
        let rows = vec![
            row("1560001", &[("enrollment", Some(500.0))]),
            row("1560002", &[("attendance_rate", Some(95.5)), ("enrollment", None)]),
        ];

        let mut out = Vec::new();
        write_report_cards(&rows, OutputFormat::Csv, &mut out).unwrap();
        let lines = lines(&out);
        assert_eq!(
            lines[0],
            "end_year,type,district_id,campus_id,district_name,campus_name,attendance_rate,enrollment,grade_span"
        );
        assert_eq!(lines[1], "2023,Campus,156,1560001,,School 1560001,,500,K-5");
        assert_eq!(lines[2], "2023,Campus,156,1560002,,School 1560002,95.5,,K-5");
    }

    #[test]
    fn test_report_card_mixed_column_keeps_numbers_and_text() {
        let row = |id: &str, value: Option<f64>, label: Option<&str>| ReportCardRecord {
            end_year: 2023,
            entity_type: EntityType::Campus,
            district_id: Some(id[..3].to_string()),
            campus_id: Some(id.to_string()),
            district_name: None,
            campus_name: None,
            values: BTreeMap::from([("enrollment".to_string(), value)]),
            labels: label
                .map(|l| BTreeMap::from([("enrollment".to_string(), l.to_string())]))
                .unwrap_or_default(),
        };
        let rows = vec![row("1560001", Some(500.0), None), row("1560002", None, Some("Closed"))];

        let mut out = Vec::new();
        write_report_cards(&rows, OutputFormat::Csv, &mut out).unwrap();
        let lines = lines(&out);
        assert_eq!(
            lines[0],
            "end_year,type,district_id,campus_id,district_name,campus_name,enrollment"
        );
        assert_eq!(lines[1], "2023,Campus,156,1560001,,,500");
        assert_eq!(lines[2], "2023,Campus,156,1560002,,,Closed");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
