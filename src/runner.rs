use rusqlite::Connection;

use crate::aggregator::flush_deals;
use crate::error::Result;
use crate::mapping::{ColumnMapping, ResolvedMapping};
use crate::matcher::match_record;
use crate::reconciler::{apply_row, RowOutcome, SalesLedger};

/// Default rows per transaction. Bounds per-chunk duration so one oversized
/// file cannot hold a single transaction open past timeout limits.
pub const DEFAULT_CHUNK_SIZE: usize = 200;

const MAX_ERROR_SAMPLES: usize = 10;
const MAX_OMITTED_SAMPLES: usize = 20;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub chunk_size: usize,
    /// Caller-supplied cap on rows handled in this invocation; the caller
    /// resumes with the remainder in a later call.
    pub max_rows: Option<usize>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_rows: None,
        }
    }
}

/// Best-effort summary of a commit run. Chunks fail independently, so the
/// counts always cover every processed row:
/// `created + updated + omitted + failed == processed`.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub omitted: usize,
    pub failed: usize,
    /// Capped sample of row/chunk failures (full counts stay in `failed`).
    pub errors: Vec<String>,
    /// Capped sample of skip reasons.
    pub omitted_reasons: Vec<String>,
}

impl ImportReport {
    fn record(&mut self, row_no: usize, outcome: &RowOutcome) {
        self.processed += 1;
        match outcome {
            RowOutcome::Created => self.created += 1,
            RowOutcome::Updated => self.updated += 1,
            RowOutcome::Skipped(reason) => {
                self.omitted += 1;
                if self.omitted_reasons.len() < MAX_OMITTED_SAMPLES {
                    self.omitted_reasons.push(format!("row {row_no}: {reason}"));
                }
            }
            RowOutcome::Failed(msg) => {
                self.failed += 1;
                if self.errors.len() < MAX_ERROR_SAMPLES {
                    self.errors.push(format!("row {row_no}: {msg}"));
                }
            }
        }
    }
}

/// Run a full import: map, match and apply each row in file order, one
/// transaction per chunk, then flush the accumulated sales ledger into
/// `closed_deals`. A chunk-level fault rolls that chunk back and records all
/// of its rows as failed; later chunks still run. Whole-import atomicity is
/// traded away for resilience on large files.
pub fn run_import(
    conn: &mut Connection,
    headers: &[String],
    rows: &[Vec<String>],
    mapping: &ColumnMapping,
    opts: &ImportOptions,
) -> Result<ImportReport> {
    let resolved = mapping.resolve(headers);
    let limit = opts.max_rows.unwrap_or(rows.len()).min(rows.len());
    let rows = &rows[..limit];
    let chunk_size = opts.chunk_size.max(1);

    let mut report = ImportReport::default();
    let mut sales = SalesLedger::new();

    for (chunk_no, chunk) in rows.chunks(chunk_size).enumerate() {
        let base_row = chunk_no * chunk_size;
        match run_chunk(conn, chunk, &resolved) {
            Ok((outcomes, chunk_sales)) => {
                for (i, outcome) in outcomes.iter().enumerate() {
                    report.record(base_row + i + 1, outcome);
                }
                merge_sales(&mut sales, chunk_sales);
            }
            Err(e) => {
                // Rolled back in full; every row in the chunk is failed.
                report.processed += chunk.len();
                report.failed += chunk.len();
                if report.errors.len() < MAX_ERROR_SAMPLES {
                    report.errors.push(format!(
                        "chunk {} (rows {}-{}): {e}",
                        chunk_no + 1,
                        base_row + 1,
                        base_row + chunk.len()
                    ));
                }
            }
        }
    }

    flush_deals(conn, &sales)?;
    Ok(report)
}

/// One chunk inside one transaction. Row-level problems come back inside the
/// outcomes; any `Err` here means the transaction was dropped uncommitted.
fn run_chunk(
    conn: &mut Connection,
    chunk: &[Vec<String>],
    resolved: &ResolvedMapping,
) -> Result<(Vec<RowOutcome>, SalesLedger)> {
    let tx = conn.transaction()?;
    let mut outcomes = Vec::with_capacity(chunk.len());
    let mut sales = SalesLedger::new();

    for row in chunk {
        let record = resolved.map_row(row);
        let decisions = match_record(&tx, &record)?;
        let outcome = apply_row(&tx, &record, &decisions, &mut sales)?;
        outcomes.push(outcome);
    }

    tx.commit()?;
    Ok((outcomes, sales))
}

fn merge_sales(dst: &mut SalesLedger, src: SalesLedger) {
    for (client_id, agg) in src {
        let entry = dst.entry(client_id).or_default();
        if entry.company_name.is_empty() {
            entry.company_name = agg.company_name;
            entry.vendor_id = agg.vendor_id;
        }
        entry.new_lines += agg.new_lines;
        entry.renewed_lines += agg.renewed_lines;
        entry.total_amount += agg.total_amount;
    }
}
