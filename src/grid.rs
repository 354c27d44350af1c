use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Result, SublineError};

/// A decoded spreadsheet: one header row plus rectangular data rows. Missing
/// cells are empty strings, never absent; every row has header arity.
#[derive(Debug, Clone)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn load(path: &Path) -> Result<Grid> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => load_csv(path),
            "xls" | "xlsx" => load_xlsx(path),
            other => Err(SublineError::Spreadsheet(format!(
                "unsupported file extension '{other}' (expected csv, xls or xlsx)"
            ))),
        }
    }
}

fn load_csv(path: &Path) -> Result<Grid> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
        if headers.is_empty() {
            if cells.iter().all(|c| c.is_empty()) {
                continue; // leading blank lines before the header
            }
            headers = cells;
            continue;
        }
        push_row(&mut rows, cells, headers.len());
    }
    if headers.is_empty() {
        return Err(SublineError::Spreadsheet("no header row found".to_string()));
    }
    Ok(Grid { headers, rows })
}

fn load_xlsx(path: &Path) -> Result<Grid> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| SublineError::Spreadsheet(format!("failed to open workbook: {e}")))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SublineError::Spreadsheet("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SublineError::Spreadsheet(format!("failed to read sheet: {e}")))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = sheet_rows
        .next()
        .map(|row| row.iter().map(cell_to_string).collect())
        .unwrap_or_default();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SublineError::Spreadsheet("no header row found".to_string()));
    }

    let mut rows = Vec::new();
    for row in sheet_rows {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        push_row(&mut rows, cells, headers.len());
    }
    Ok(Grid { headers, rows })
}

fn push_row(rows: &mut Vec<Vec<String>>, mut cells: Vec<String>, arity: usize) {
    if cells.iter().all(|c| c.is_empty()) {
        return;
    }
    cells.resize(arity, String::new());
    cells.truncate(arity);
    rows.push(cells);
}

fn cell_to_string(cell: &calamine::Data) -> String {
    use calamine::Data;
    match cell {
        Data::String(s) => s.trim().to_string(),
        // BANs and phone numbers come out of Excel as floats; an integral
        // float must not render as "123456789.0".
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        _ => String::new(),
    }
}

/// Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug).
pub fn excel_serial_to_date(serial: f64) -> String {
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}
