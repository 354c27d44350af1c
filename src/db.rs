use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vendors (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    name_key TEXT NOT NULL,
    contact_person TEXT,
    email TEXT,
    phone TEXT,
    address TEXT,
    city TEXT,
    zip TEXT,
    vendor_id INTEGER,
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (vendor_id) REFERENCES vendors(id)
);

CREATE INDEX IF NOT EXISTS idx_clients_name_key ON clients(name_key);

CREATE TABLE IF NOT EXISTS bans (
    id INTEGER PRIMARY KEY,
    client_id INTEGER NOT NULL,
    number TEXT NOT NULL UNIQUE,
    ban_type TEXT,
    status TEXT NOT NULL DEFAULT 'activo',
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (client_id) REFERENCES clients(id)
);

CREATE TABLE IF NOT EXISTS subscribers (
    id INTEGER PRIMARY KEY,
    ban_id INTEGER NOT NULL,
    phone TEXT NOT NULL UNIQUE,
    plan TEXT,
    monthly_value REAL,
    remaining_payments INTEGER,
    contract_term INTEGER,
    contract_end_date TEXT,
    status TEXT NOT NULL DEFAULT 'activo',
    is_active INTEGER DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (ban_id) REFERENCES bans(id)
);

CREATE TABLE IF NOT EXISTS closed_deals (
    id INTEGER PRIMARY KEY,
    client_id INTEGER NOT NULL,
    vendor_id INTEGER,
    company_name TEXT,
    deal_date TEXT NOT NULL,
    new_lines INTEGER NOT NULL DEFAULT 0,
    renewed_lines INTEGER NOT NULL DEFAULT 0,
    total_amount REAL NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (client_id) REFERENCES clients(id),
    FOREIGN KEY (vendor_id) REFERENCES vendors(id),
    UNIQUE (client_id, deal_date)
);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    row_count INTEGER,
    processed INTEGER,
    created INTEGER,
    updated INTEGER,
    omitted INTEGER,
    failed INTEGER,
    checksum TEXT
);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn get_metadata(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row("SELECT value FROM metadata WHERE key = ?1", [key], |r| r.get(0))
        .ok()
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["vendors", "clients", "bans", "subscribers", "closed_deals", "imports", "metadata"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_ban_number_is_unique() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO clients (name, name_key) VALUES ('Acme', 'acme')", []).unwrap();
        conn.execute("INSERT INTO bans (client_id, number) VALUES (1, '123456789')", []).unwrap();
        let second = conn.execute("INSERT INTO bans (client_id, number) VALUES (1, '123456789')", []);
        assert!(second.is_err());
    }

    #[test]
    fn test_subscriber_phone_is_unique() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO clients (name, name_key) VALUES ('Acme', 'acme')", []).unwrap();
        conn.execute("INSERT INTO bans (client_id, number) VALUES (1, '123456789')", []).unwrap();
        conn.execute("INSERT INTO subscribers (ban_id, phone) VALUES (1, '5550001111')", []).unwrap();
        let second = conn.execute("INSERT INTO subscribers (ban_id, phone) VALUES (1, '5550001111')", []);
        assert!(second.is_err());
    }

    #[test]
    fn test_metadata_roundtrip() {
        let (_dir, conn) = test_db();
        assert_eq!(get_metadata(&conn, "company_name"), None);
        set_metadata(&conn, "company_name", "Island Wireless").unwrap();
        set_metadata(&conn, "company_name", "Island Wireless LLC").unwrap();
        assert_eq!(get_metadata(&conn, "company_name").as_deref(), Some("Island Wireless LLC"));
    }
}
