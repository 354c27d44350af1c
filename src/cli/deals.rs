use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::money;
use crate::settings::db_path;

pub fn run(date: Option<&str>) -> Result<()> {
    let conn = get_connection(&db_path())?;

    let base = "SELECT d.deal_date, d.company_name, v.name, d.new_lines, d.renewed_lines, d.total_amount \
                FROM closed_deals d LEFT JOIN vendors v ON d.vendor_id = v.id";
    let mut stmt;
    let rows: Vec<(String, Option<String>, Option<String>, i64, i64, f64)> = match date {
        Some(day) => {
            stmt = conn.prepare(&format!(
                "{base} WHERE d.deal_date = ?1 ORDER BY d.company_name"
            ))?;
            stmt.query_map([day], map_deal)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            stmt = conn.prepare(&format!("{base} ORDER BY d.deal_date DESC, d.company_name"))?;
            stmt.query_map([], map_deal)?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    if rows.is_empty() {
        println!("No closed deals recorded.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Client", "Vendor", "New", "Renewed", "Total"]);
    let mut grand_total = 0.0;
    for (day, company, vendor, new_lines, renewed, total) in rows {
        grand_total += total;
        table.add_row(vec![
            Cell::new(day),
            Cell::new(company.unwrap_or_default()),
            Cell::new(vendor.unwrap_or_default()),
            Cell::new(new_lines),
            Cell::new(renewed),
            Cell::new(money(total)),
        ]);
    }
    println!("Closed deals\n{table}");
    println!("Grand total: {}", money(grand_total));
    Ok(())
}

#[allow(clippy::type_complexity)]
fn map_deal(
    row: &rusqlite::Row<'_>,
) -> std::result::Result<(String, Option<String>, Option<String>, i64, i64, f64), rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}
