//! Parser CLI - Inspects a downloaded headcount spreadsheet
//!
//! Usage:
//!   # Summary of a school grade file:
//!   cargo run --bin parser -- --file data/raw/2024_school_grade_45.xlsx --level school --kind grade
//!
//!   # Dump parsed rows as CSV:
//!   cargo run --bin parser -- --file data/raw/2024_district_demo_45.xlsx --level district --kind demo --csv

use anyhow::{Context, Result};
use clap::Parser;
use headcount_parser::schema::{schema, TEXT_COLUMNS};
use headcount_parser::{parse_headcount, DataKind, EntityLevel, HeadcountFile};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "parser", version, about = "Parses a SC headcount spreadsheet")]
struct Args {
    /// Path to the XLS/XLSX file
    #[arg(long)]
    file: PathBuf,

    /// Entity level of the file (school or district)
    #[arg(long)]
    level: EntityLevel,

    /// Data kind of the file (grade or demo)
    #[arg(long)]
    kind: DataKind,

    /// Write parsed rows to stdout as CSV instead of a summary
    #[arg(long, default_value = "false")]
    csv: bool,
}

/// Count columns in schema order, then any generic overflow columns.
fn count_columns(file: &HeadcountFile) -> Vec<String> {
    let mut columns: Vec<String> = schema(file.level, file.kind)
        .into_iter()
        .filter(|c| !TEXT_COLUMNS.contains(c))
        .map(str::to_string)
        .collect();
    for row in &file.rows {
        for key in row.counts.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns.retain(|c| file.rows.iter().any(|r| r.counts.contains_key(c)));
    columns
}

fn write_csv(file: &HeadcountFile) -> Result<()> {
    let columns = count_columns(file);
    let mut writer = csv::Writer::from_writer(std::io::stdout());

    let mut header = vec!["entity_id".to_string(), "district_name".to_string()];
    if file.level == EntityLevel::School {
        header.push("school_name".to_string());
    }
    header.extend(columns.iter().cloned());
    writer.write_record(&header)?;

    for row in &file.rows {
        let mut record = vec![
            row.entity_id.clone(),
            row.district_name.clone().unwrap_or_default(),
        ];
        if file.level == EntityLevel::School {
            record.push(row.school_name.clone().unwrap_or_default());
        }
        for column in &columns {
            record.push(row.count(column).map(|v| v.to_string()).unwrap_or_default());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn print_summary(file: &HeadcountFile) {
    println!("Header row: {} (Excel row {})", file.header_row, file.header_row + 1);
    println!("Rows kept: {}", file.rows.len());
    println!("Rows dropped (no valid ID): {}", file.dropped_rows);

    let columns = count_columns(file);
    println!("\nCount columns ({}):", columns.len());
    for (i, c) in columns.iter().enumerate() {
        println!("  [{:2}] {}", i, c);
    }

    println!("\nSample rows:");
    for (i, row) in file.rows.iter().take(3).enumerate() {
        println!(
            "  [{}] {} | {} | {} | total={}",
            i + 1,
            row.entity_id,
            row.district_name.as_deref().unwrap_or("-"),
            row.school_name.as_deref().unwrap_or("-"),
            row.count("total").map(|v| v.to_string()).unwrap_or_else(|| "NA".to_string())
        );
    }
    if file.rows.len() > 3 {
        println!("  ... and {} more", file.rows.len() - 3);
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let file = parse_headcount(&bytes, args.level, args.kind)
        .with_context(|| format!("Failed to parse {} as {} {}", args.file.display(), args.level, args.kind))?;

    if args.csv {
        write_csv(&file)?;
    } else {
        println!("=== SC Headcount Parser ===");
        println!("File: {} ({} bytes)", args.file.display(), bytes.len());
        println!("Layout: {} {}", args.level, args.kind);
        print_summary(&file);
    }

    Ok(())
}
