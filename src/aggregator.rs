use rusqlite::Connection;

use crate::error::Result;
use crate::reconciler::SalesLedger;

/// Flush the run's sales ledger into `closed_deals`: one row per client per
/// calendar day, added-to when the day already has one. Returns the number
/// of clients flushed.
pub fn flush_deals(conn: &mut Connection, sales: &SalesLedger) -> Result<usize> {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    flush_deals_on(conn, sales, &today)
}

pub fn flush_deals_on(conn: &mut Connection, sales: &SalesLedger, deal_date: &str) -> Result<usize> {
    if sales.is_empty() {
        return Ok(0);
    }
    let tx = conn.transaction()?;
    for (client_id, agg) in sales {
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM closed_deals WHERE client_id = ?1 AND deal_date = ?2",
                rusqlite::params![client_id, deal_date],
                |r| r.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        match existing {
            Some(deal_id) => {
                tx.execute(
                    "UPDATE closed_deals SET \
                        new_lines = new_lines + ?1, \
                        renewed_lines = renewed_lines + ?2, \
                        total_amount = total_amount + ?3, \
                        updated_at = datetime('now') \
                     WHERE id = ?4",
                    rusqlite::params![agg.new_lines, agg.renewed_lines, agg.total_amount, deal_id],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO closed_deals \
                        (client_id, vendor_id, company_name, deal_date, new_lines, renewed_lines, total_amount) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    rusqlite::params![
                        client_id,
                        agg.vendor_id,
                        agg.company_name,
                        deal_date,
                        agg.new_lines,
                        agg.renewed_lines,
                        agg.total_amount,
                    ],
                )?;
            }
        }

        // The vendor association only routes this batch's commission; clear
        // it so the next unrelated import cannot inherit stale attribution.
        tx.execute("UPDATE clients SET vendor_id = NULL WHERE id = ?1", [client_id])?;
    }
    tx.commit()?;
    Ok(sales.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::reconciler::SalesAggregate;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn seed_client(conn: &Connection, name: &str, vendor_id: Option<i64>) -> i64 {
        conn.execute(
            "INSERT INTO clients (name, name_key, vendor_id) VALUES (?1, lower(?1), ?2)",
            rusqlite::params![name, vendor_id],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn ledger(client_id: i64, new_lines: i64, renewed: i64, amount: f64) -> SalesLedger {
        let mut sales = SalesLedger::new();
        sales.insert(
            client_id,
            SalesAggregate {
                vendor_id: None,
                company_name: "Acme".to_string(),
                new_lines,
                renewed_lines: renewed,
                total_amount: amount,
            },
        );
        sales
    }

    #[test]
    fn test_creates_one_deal_per_client_day() {
        let (_dir, mut conn) = test_db();
        let id = seed_client(&conn, "Acme", None);
        let flushed = flush_deals_on(&mut conn, &ledger(id, 3, 1, 120.0), "2026-08-31").unwrap();
        assert_eq!(flushed, 1);
        let (new_lines, renewed, total): (i64, i64, f64) = conn
            .query_row(
                "SELECT new_lines, renewed_lines, total_amount FROM closed_deals",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!((new_lines, renewed), (3, 1));
        assert_eq!(total, 120.0);
    }

    #[test]
    fn test_same_day_flush_adds_instead_of_duplicating() {
        let (_dir, mut conn) = test_db();
        let id = seed_client(&conn, "Acme", None);
        flush_deals_on(&mut conn, &ledger(id, 2, 0, 60.0), "2026-08-31").unwrap();
        flush_deals_on(&mut conn, &ledger(id, 1, 2, 40.0), "2026-08-31").unwrap();

        let deals: i64 = conn.query_row("SELECT count(*) FROM closed_deals", [], |r| r.get(0)).unwrap();
        assert_eq!(deals, 1);
        let (new_lines, renewed, total): (i64, i64, f64) = conn
            .query_row(
                "SELECT new_lines, renewed_lines, total_amount FROM closed_deals",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!((new_lines, renewed), (3, 2));
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_different_day_gets_its_own_deal() {
        let (_dir, mut conn) = test_db();
        let id = seed_client(&conn, "Acme", None);
        flush_deals_on(&mut conn, &ledger(id, 1, 0, 30.0), "2026-08-30").unwrap();
        flush_deals_on(&mut conn, &ledger(id, 1, 0, 30.0), "2026-08-31").unwrap();
        let deals: i64 = conn.query_row("SELECT count(*) FROM closed_deals", [], |r| r.get(0)).unwrap();
        assert_eq!(deals, 2);
    }

    #[test]
    fn test_vendor_attribution_cleared_after_flush() {
        let (_dir, mut conn) = test_db();
        conn.execute("INSERT INTO vendors (name) VALUES ('Hernan')", []).unwrap();
        let id = seed_client(&conn, "Acme", Some(1));
        flush_deals_on(&mut conn, &ledger(id, 1, 0, 30.0), "2026-08-31").unwrap();
        let vendor_id: Option<i64> = conn
            .query_row("SELECT vendor_id FROM clients WHERE id = ?1", [id], |r| r.get(0))
            .unwrap();
        assert_eq!(vendor_id, None);
    }

    #[test]
    fn test_empty_ledger_is_a_no_op() {
        let (_dir, mut conn) = test_db();
        assert_eq!(flush_deals_on(&mut conn, &SalesLedger::new(), "2026-08-31").unwrap(), 0);
        let deals: i64 = conn.query_row("SELECT count(*) FROM closed_deals", [], |r| r.get(0)).unwrap();
        assert_eq!(deals, 0);
    }
}
