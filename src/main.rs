use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::Path;
use std::process;

use rental_ledger::{
    count_records, export_csv, get_all_records, init_tracing, migrate, open_database,
    parse_sales_log, Settings,
};

const USAGE: &str = "Usage:
  rental-ledger parse <notes.txt>      Print parsed months as JSON
  rental-ledger migrate <notes.txt>    Parse and store financial records
  rental-ledger records                List stored records
  rental-ledger export <out.csv>       Export stored records to CSV";

fn main() -> Result<()> {
    let settings = Settings::from_env();
    init_tracing(settings.log_json);

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);
    let target = args.get(2).map(Path::new);

    match (command, target) {
        (Some("parse"), Some(path)) => run_parse(path),
        (Some("migrate"), Some(path)) => run_migrate(&settings, path),
        (Some("records"), _) => run_records(&settings),
        (Some("export"), Some(path)) => run_export(&settings, path),
        _ => {
            eprintln!("{}", USAGE);
            process::exit(2);
        }
    }
}

fn read_notes(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read notes: {}", path.display()))
}

fn run_parse(path: &Path) -> Result<()> {
    let months = parse_sales_log(&read_notes(path)?);
    println!("{}", serde_json::to_string_pretty(&months)?);
    Ok(())
}

fn run_migrate(settings: &Settings, path: &Path) -> Result<()> {
    println!("🔁 Migrating sales notes: {}", path.display());

    let months = parse_sales_log(&read_notes(path)?);
    let mut conn = open_database(&settings.database_path)?;
    let report = migrate(&mut conn, &months)?;

    println!("✓ Months parsed: {}", report.months);
    println!("✓ Entries found: {}", report.entries);
    println!("✓ Inserted: {} records", report.inserted);
    println!("✓ Skipped duplicates: {}", report.duplicates);
    println!("✓ Skipped zero/negative amounts: {}", report.skipped_non_positive);
    println!("✓ Database now holds {} records", count_records(&conn)?);

    Ok(())
}

fn run_records(settings: &Settings) -> Result<()> {
    let conn = open_database(&settings.database_path)?;
    let records = get_all_records(&conn)?;

    for record in &records {
        println!(
            "{}  {:<7}  {:>10.2}  {}",
            record.created_at.format("%Y-%m"),
            record.category.as_str(),
            record.amount,
            record.notes
        );
    }
    println!("\n📊 {} records", records.len());

    Ok(())
}

fn run_export(settings: &Settings, path: &Path) -> Result<()> {
    let conn = open_database(&settings.database_path)?;
    let written = export_csv(&conn, path)?;
    println!("✓ Exported {} records to {}", written, path.display());
    Ok(())
}
