use crate::db::{get_connection, get_metadata};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::get_data_dir;

pub fn run() -> Result<()> {
    let data_dir = get_data_dir();
    let db_path = data_dir.join("subline.db");

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;

        let company = get_metadata(&conn, "company_name");
        println!("Company:    {}", company.as_deref().unwrap_or("(not set)"));

        let clients: i64 = conn.query_row("SELECT count(*) FROM clients", [], |r| r.get(0))?;
        let bans: i64 = conn.query_row("SELECT count(*) FROM bans", [], |r| r.get(0))?;
        let active_bans: i64 =
            conn.query_row("SELECT count(*) FROM bans WHERE is_active = 1", [], |r| r.get(0))?;
        let subscribers: i64 = conn.query_row("SELECT count(*) FROM subscribers", [], |r| r.get(0))?;
        let vendors: i64 = conn.query_row("SELECT count(*) FROM vendors", [], |r| r.get(0))?;
        let deals: i64 = conn.query_row("SELECT count(*) FROM closed_deals", [], |r| r.get(0))?;
        let imports: i64 = conn.query_row("SELECT count(*) FROM imports", [], |r| r.get(0))?;

        println!();
        println!("Clients:      {clients}");
        println!("BANs:         {bans} ({active_bans} active)");
        println!("Subscribers:  {subscribers}");
        println!("Vendors:      {vendors}");
        println!("Closed deals: {deals}");
        println!("Imports:      {imports}");
    } else {
        println!();
        println!("Database not found. Run `subline init` to set up.");
    }

    Ok(())
}
