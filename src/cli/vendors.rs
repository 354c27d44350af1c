use comfy_table::{Cell, Table};

use crate::db::get_connection;
use crate::error::Result;
use crate::settings::db_path;

pub fn add(name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    conn.execute("INSERT INTO vendors (name) VALUES (?1)", [name.trim()])?;
    println!("Added vendor: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let mut stmt = conn.prepare(
        "SELECT v.id, v.name, count(c.id) FROM vendors v \
         LEFT JOIN clients c ON c.vendor_id = v.id \
         GROUP BY v.id ORDER BY v.name",
    )?;
    let rows: Vec<(i64, String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Attributed Clients"]);
    for (id, name, clients) in rows {
        table.add_row(vec![Cell::new(id), Cell::new(name), Cell::new(clients)]);
    }
    println!("Vendors\n{table}");
    Ok(())
}
