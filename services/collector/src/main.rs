//! Collector CLI - Downloads one SC headcount spreadsheet
//!
//! Usage:
//!   # Show the candidate URLs without downloading:
//!   cargo run --bin collector -- --year 2024 --level school --kind grade --list
//!
//!   # Download the first working candidate into ./data/raw:
//!   cargo run --bin collector -- --year 2017 --level district --kind demo --count-day 135

use anyhow::{Context, Result};
use clap::Parser;
use headcount_collector::{
    fetch_first, headcount_candidates, CollectorConfig, CountDay, HeadcountRequest, HttpClient,
    HEADCOUNT_YEARS,
};
use headcount_parser::{DataKind, EntityLevel};
use std::path::PathBuf;
use tokio::fs;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "collector", version, about = "Downloads a SC active student headcount file")]
struct Args {
    /// School year end (2024 = 2023-24)
    #[arg(long)]
    year: i32,

    /// Entity level (school or district)
    #[arg(long)]
    level: EntityLevel,

    /// Data kind (grade or demo)
    #[arg(long)]
    kind: DataKind,

    /// Count day (45, 135 or 180)
    #[arg(long, default_value = "45")]
    count_day: CountDay,

    /// Only print the candidate URLs
    #[arg(long, default_value = "false")]
    list: bool,

    /// Directory to save the file into
    #[arg(long, default_value = "./data/raw")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = CollectorConfig::from_env();

    if !HEADCOUNT_YEARS.contains(&args.year) {
        anyhow::bail!(
            "year {} is outside {}-{}",
            args.year,
            HEADCOUNT_YEARS.start(),
            HEADCOUNT_YEARS.end()
        );
    }

    let request = HeadcountRequest::new(args.year, args.level, args.kind, args.count_day);
    let candidates = headcount_candidates(&config.headcount_base_url, &request);

    println!("=== SC Headcount Collector ===");
    println!("Request: {}", request.label());
    println!("Candidates: {}", candidates.len());

    if args.list {
        for (i, url) in candidates.iter().enumerate() {
            println!("  [{:2}] {}", i + 1, url);
        }
        return Ok(());
    }

    let client = HttpClient::new(&config).context("Failed to build HTTP client")?;
    let file = fetch_first(&client, &request.label(), &candidates, &config).await?;

    fs::create_dir_all(&args.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;
    let filename = format!(
        "{}_{}_{}_{}.{}",
        args.year,
        args.level,
        args.kind,
        args.count_day,
        file.extension()
    );
    let path = args.out_dir.join(filename);
    fs::write(&path, &file.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("\n=== Download Summary ===");
    println!("URL: {}", file.url);
    println!("Attempts: {}", file.attempts);
    println!("Size: {} bytes", file.bytes.len());
    println!("Hash: {}", file.content_hash);
    println!("Captured: {}", file.captured_at.to_rfc3339());
    println!("Saved to: {}", path.display());

    Ok(())
}
