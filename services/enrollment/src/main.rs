//! SC School Data CLI - Enrollment and report card tables
//!
//! Usage:
//!   # Tidy enrollment for two years as CSV on stdout:
//!   cargo run --bin scschooldata -- fetch --year 2023 --year 2024
//!
//!   # Wide 135-day table as JSON, bypassing the cache:
//!   cargo run --bin scschooldata -- fetch --year 2024 --wide --count-day 135 --no-cache --format json
//!
//!   # Report cards, available years, cache maintenance:
//!   cargo run --bin scschooldata -- report-cards --year 2023 --output rc_2023.csv
//!   cargo run --bin scschooldata -- years --source reportcards
//!   cargo run --bin scschooldata -- cache status
//!   cargo run --bin scschooldata -- cache clear --year 2024

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scschooldata::{
    available_years, grade_aggregates, parse_count_day, write_report_cards, write_table,
    DataSource, Enrollment, EnrollmentTable, FetchOptions, OutputFormat,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "scschooldata", version, about = "South Carolina school enrollment data")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch enrollment for one or more end years
    Fetch {
        /// School year end (2024 = 2023-24); repeat for several years
        #[arg(long = "year", required = true)]
        years: Vec<i32>,

        /// One row per entity instead of tidy rows
        #[arg(long, default_value = "false")]
        wide: bool,

        /// Skip the on-disk cache
        #[arg(long, default_value = "false")]
        no_cache: bool,

        /// Count day (45, 135 or 180)
        #[arg(long, default_value = "45")]
        count_day: String,

        /// Append K8 / HS / K12 band rows (tidy only)
        #[arg(long, default_value = "false")]
        grade_bands: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Fetch report card data for one end year
    ReportCards {
        #[arg(long)]
        year: i32,

        #[arg(long, default_value = "false")]
        no_cache: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List end years with published data
    Years {
        /// headcounts or reportcards
        #[arg(long, default_value = "headcounts")]
        source: DataSource,
    },

    /// Inspect or clear the table cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// List cached tables
    Status,
    /// Remove cached tables (all, one year, one tag, or one entry)
    Clear {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        tag: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct OutputArgs {
    /// csv or json
    #[arg(long, default_value = "csv")]
    format: OutputFormat,

    /// Write to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl OutputArgs {
    fn writer(&self) -> Result<Box<dyn Write>> {
        match &self.output {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                Ok(Box::new(BufWriter::new(file)))
            }
            None => Ok(Box::new(io::stdout().lock())),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Fetch {
            years,
            wide,
            no_cache,
            count_day,
            grade_bands,
            output,
        } => {
            let options = FetchOptions {
                tidy: !wide,
                use_cache: !no_cache,
                count_day: parse_count_day(&count_day)?,
            };
            let enrollment = Enrollment::from_env()?;
            let mut table = enrollment.fetch_enrollment_multi(&years, &options).await?;

            if grade_bands {
                match &mut table {
                    EnrollmentTable::Tidy(rows) => {
                        let bands = grade_aggregates(rows);
                        rows.extend(bands);
                    }
                    EnrollmentTable::Wide(_) => anyhow::bail!("--grade-bands needs tidy output (drop --wide)"),
                }
            }

            let mut writer = output.writer()?;
            write_table(&table, output.format, &mut writer)?;
            writer.flush()?;
            eprintln!("{} rows for {} year(s)", table.len(), years.len());
        }

        Command::ReportCards {
            year,
            no_cache,
            output,
        } => {
            let enrollment = Enrollment::from_env()?;
            let records = enrollment.fetch_report_cards(year, !no_cache).await?;

            let mut writer = output.writer()?;
            write_report_cards(&records, output.format, &mut writer)?;
            writer.flush()?;
            eprintln!("{} report card rows for {}", records.len(), year);
        }

        Command::Years { source } => {
            for year in available_years(source) {
                println!("{}", year);
            }
        }

        Command::Cache { action } => {
            let enrollment = Enrollment::from_env()?;
            match action {
                CacheAction::Status => {
                    let entries = enrollment.cache_status()?;
                    println!("=== SC School Data Cache ===");
                    println!("Directory: {}", enrollment.cache().dir().display());
                    if entries.is_empty() {
                        println!("(empty)");
                    }
                    for entry in &entries {
                        println!(
                            "  {:<20} {:>10} bytes  {:>6.1} days  {}",
                            entry.key.to_string(),
                            entry.size_bytes,
                            entry.age_days,
                            entry.modified.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
                CacheAction::Clear { year, tag } => {
                    let removed = enrollment.clear_cache(year, tag.as_deref())?;
                    println!("Removed {} cache entr{}", removed, if removed == 1 { "y" } else { "ies" });
                }
            }
        }
    }

    Ok(())
}
