use std::path::Path;

use colored::Colorize;

use crate::db::get_connection;
use crate::error::Result;
use crate::grid::{compute_checksum, Grid};
use crate::mapping::ColumnMapping;
use crate::runner::{run_import, ImportOptions, ImportReport};
use crate::settings::{db_path, load_settings};

pub fn run(
    file: &str,
    mapping_file: &str,
    chunk_size: Option<usize>,
    max_rows: Option<usize>,
    force: bool,
) -> Result<()> {
    let file_path = Path::new(file);
    let mapping_json = std::fs::read_to_string(mapping_file)?;
    // Mapping problems are fatal before any row is touched.
    let mapping = ColumnMapping::from_json_str(&mapping_json)?;

    let mut conn = get_connection(&db_path())?;

    let checksum = compute_checksum(file_path)?;
    let already_imported = conn
        .prepare("SELECT 1 FROM imports WHERE checksum = ?1")?
        .exists([&checksum])?;
    if already_imported && !force {
        println!("This file has already been imported (duplicate checksum). Use --force to repeat.");
        return Ok(());
    }

    let grid = Grid::load(file_path)?;
    let opts = ImportOptions {
        chunk_size: chunk_size.unwrap_or_else(|| load_settings().default_chunk_size),
        max_rows,
    };
    let report = run_import(&mut conn, &grid.headers, &grid.rows, &mapping, &opts)?;

    conn.execute(
        "INSERT INTO imports (filename, row_count, processed, created, updated, omitted, failed, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            grid.rows.len() as i64,
            report.processed as i64,
            report.created as i64,
            report.updated as i64,
            report.omitted as i64,
            report.failed as i64,
            checksum,
        ],
    )?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &ImportReport) {
    println!(
        "Processed {} rows: {} created, {} updated, {} omitted, {} failed",
        report.processed,
        report.created.to_string().green(),
        report.updated.to_string().cyan(),
        report.omitted.to_string().yellow(),
        report.failed.to_string().red(),
    );
    if !report.omitted_reasons.is_empty() {
        println!("\nOmitted (first {}):", report.omitted_reasons.len());
        for reason in &report.omitted_reasons {
            println!("  {reason}");
        }
    }
    if !report.errors.is_empty() {
        println!("\nErrors (first {}):", report.errors.len());
        for err in &report.errors {
            println!("  {}", err.red());
        }
    }
}
