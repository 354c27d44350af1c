use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::error::Result;
use crate::matcher::{normalize_name, status_label, MatchDecision, RowDecisions};
use crate::models::MappedRecord;

// ---------------------------------------------------------------------------
// Value parsing
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> f64 {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -inner.trim().parse::<f64>().unwrap_or(0.0);
    }
    s.parse().unwrap_or(0.0)
}

pub fn parse_count(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Row outcome and sales ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Created,
    Updated,
    Skipped(&'static str),
    Failed(String),
}

/// Per-client accumulator for the run, flushed into `closed_deals` once all
/// chunks complete. Sums are commutative, so chunk order never changes them.
#[derive(Debug, Clone, Default)]
pub struct SalesAggregate {
    pub vendor_id: Option<i64>,
    pub company_name: String,
    pub new_lines: i64,
    pub renewed_lines: i64,
    pub total_amount: f64,
}

pub type SalesLedger = BTreeMap<i64, SalesAggregate>;

/// Storage errors a single row may absorb without poisoning its chunk:
/// constraint violations (duplicate-key races, FK breakage). Anything else
/// escaping a row is treated as a chunk-level fault.
pub fn is_row_recoverable(err: &rusqlite::Error) -> bool {
    use rusqlite::ffi;
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.extended_code,
            ffi::SQLITE_CONSTRAINT_UNIQUE
                | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                | ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                | ffi::SQLITE_CONSTRAINT_NOTNULL
                | ffi::SQLITE_CONSTRAINT_CHECK
        ),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// apply_row
// ---------------------------------------------------------------------------

/// Apply one row's decisions inside the caller's transaction, in dependency
/// order Client -> Account -> Subscriber. A failed action aborts its
/// dependents but never the surrounding chunk; the error comes back inside
/// `RowOutcome::Failed`. Only non-recoverable storage faults propagate as
/// `Err`, which the batch runner turns into a chunk rollback.
pub fn apply_row(
    conn: &Connection,
    record: &MappedRecord,
    decisions: &RowDecisions,
    sales: &mut SalesLedger,
) -> Result<RowOutcome> {
    let vendor_id = lookup_vendor(conn, record.client.owner_name.as_deref())?;

    // Client first; rows without a BAN still enrich the client record.
    let client_id = match &decisions.client {
        MatchDecision::Skip(_) => None,
        MatchDecision::Create => match create_client(conn, record, decisions, vendor_id) {
            Ok(id) => Some(id),
            Err(e) if is_row_recoverable(&e) => {
                return Ok(RowOutcome::Failed(format!("client: {e}")))
            }
            Err(e) => return Err(e.into()),
        },
        MatchDecision::Update(id) => match update_client(conn, *id, record, vendor_id) {
            Ok(()) => Some(*id),
            Err(e) if is_row_recoverable(&e) => {
                return Ok(RowOutcome::Failed(format!("client: {e}")))
            }
            Err(e) => return Err(e.into()),
        },
    };

    let ban_id = match &decisions.account {
        MatchDecision::Skip(reason) => return Ok(RowOutcome::Skipped(reason)),
        MatchDecision::Create => {
            let Some(client_id) = client_id else {
                return Ok(RowOutcome::Failed(
                    "account: no client resolved for new BAN".to_string(),
                ));
            };
            match create_ban(conn, client_id, record, decisions) {
                Ok(id) => id,
                Err(e) if is_row_recoverable(&e) => {
                    return Ok(RowOutcome::Failed(format!("account: {e}")))
                }
                Err(e) => return Err(e.into()),
            }
        }
        MatchDecision::Update(id) => match update_ban(conn, *id, record) {
            Ok(()) => *id,
            Err(e) if is_row_recoverable(&e) => {
                // A failed account action aborts this row's subscriber action.
                return Ok(RowOutcome::Failed(format!("account: {e}")))
            }
            Err(e) => return Err(e.into()),
        },
    };

    let account_updated = matches!(decisions.account, MatchDecision::Update(_));
    let mut subscriber_created = false;
    let mut subscriber_updated = false;

    match &decisions.subscriber {
        MatchDecision::Skip(_) => {}
        MatchDecision::Create => match create_subscriber(conn, ban_id, record, decisions) {
            Ok(()) => subscriber_created = true,
            Err(e) if is_row_recoverable(&e) => {
                return Ok(RowOutcome::Failed(format!("subscriber: {e}")))
            }
            Err(e) => return Err(e.into()),
        },
        MatchDecision::Update(id) => match update_subscriber(conn, *id, ban_id, record) {
            Ok(()) => subscriber_updated = true,
            Err(e) if is_row_recoverable(&e) => {
                return Ok(RowOutcome::Failed(format!("subscriber: {e}")))
            }
            Err(e) => return Err(e.into()),
        },
    }

    if subscriber_created || subscriber_updated {
        if let Some(client_id) = client_id {
            record_sale(
                conn,
                client_id,
                subscriber_created,
                record
                    .subscriber
                    .monthly_value
                    .as_deref()
                    .map(parse_amount)
                    .unwrap_or(0.0),
                sales,
            )?;
        }
    }

    // A row that touches an existing account or line counts as an update,
    // even when its other entity was newly created.
    if account_updated || subscriber_updated {
        Ok(RowOutcome::Updated)
    } else {
        Ok(RowOutcome::Created)
    }
}

fn lookup_vendor(conn: &Connection, name: Option<&str>) -> Result<Option<i64>> {
    let Some(name) = name else { return Ok(None) };
    let id = conn
        .query_row(
            "SELECT id FROM vendors WHERE name = ?1 COLLATE NOCASE",
            [name.trim()],
            |r| r.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    Ok(id)
}

fn create_client(
    conn: &Connection,
    record: &MappedRecord,
    decisions: &RowDecisions,
    vendor_id: Option<i64>,
) -> std::result::Result<i64, rusqlite::Error> {
    let c = &record.client;
    conn.execute(
        "INSERT INTO clients (name, name_key, contact_person, email, phone, address, city, zip, vendor_id, is_active) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)",
        rusqlite::params![
            decisions.client_name,
            normalize_name(&decisions.client_name),
            c.contact_person,
            c.email,
            c.phone,
            c.address,
            c.city,
            c.zip,
            vendor_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fill-if-present: a blank incoming value never erases existing data, so a
/// narrow re-import cannot wipe previously enriched fields.
fn update_client(
    conn: &Connection,
    id: i64,
    record: &MappedRecord,
    vendor_id: Option<i64>,
) -> std::result::Result<(), rusqlite::Error> {
    let c = &record.client;
    conn.execute(
        "UPDATE clients SET \
            contact_person = COALESCE(?1, contact_person), \
            email = COALESCE(?2, email), \
            phone = COALESCE(?3, phone), \
            address = COALESCE(?4, address), \
            city = COALESCE(?5, city), \
            zip = COALESCE(?6, zip), \
            vendor_id = COALESCE(vendor_id, ?7), \
            updated_at = datetime('now') \
         WHERE id = ?8",
        rusqlite::params![
            c.contact_person,
            c.email,
            c.phone,
            c.address,
            c.city,
            c.zip,
            vendor_id,
            id,
        ],
    )?;
    Ok(())
}

fn create_ban(
    conn: &Connection,
    client_id: i64,
    record: &MappedRecord,
    decisions: &RowDecisions,
) -> std::result::Result<i64, rusqlite::Error> {
    let status = status_label(record.account.status.as_deref());
    conn.execute(
        "INSERT INTO bans (client_id, number, ban_type, status, is_active) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            client_id,
            decisions.ban_key,
            record.account.ban_type,
            status,
            (status == "activo") as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn update_ban(
    conn: &Connection,
    id: i64,
    record: &MappedRecord,
) -> std::result::Result<(), rusqlite::Error> {
    // client_id stays put: the existing BAN's owner is authoritative.
    if let Some(status) = record.account.status.as_deref() {
        let status = status_label(Some(status));
        conn.execute(
            "UPDATE bans SET status = ?1, is_active = ?2, ban_type = COALESCE(?3, ban_type), \
             updated_at = datetime('now') WHERE id = ?4",
            rusqlite::params![status, (status == "activo") as i64, record.account.ban_type, id],
        )?;
    } else {
        conn.execute(
            "UPDATE bans SET ban_type = COALESCE(?1, ban_type), updated_at = datetime('now') WHERE id = ?2",
            rusqlite::params![record.account.ban_type, id],
        )?;
    }
    Ok(())
}

fn create_subscriber(
    conn: &Connection,
    ban_id: i64,
    record: &MappedRecord,
    decisions: &RowDecisions,
) -> std::result::Result<(), rusqlite::Error> {
    let s = &record.subscriber;
    conn.execute(
        "INSERT INTO subscribers (ban_id, phone, plan, monthly_value, remaining_payments, \
         contract_term, contract_end_date, status, is_active) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'activo', 1)",
        rusqlite::params![
            ban_id,
            decisions.phone_key,
            s.plan,
            s.monthly_value.as_deref().map(parse_amount),
            s.remaining_payments.as_deref().map(parse_count),
            s.contract_term.as_deref().map(parse_count),
            s.contract_end_date,
        ],
    )?;
    Ok(())
}

fn update_subscriber(
    conn: &Connection,
    id: i64,
    ban_id: i64,
    record: &MappedRecord,
) -> std::result::Result<(), rusqlite::Error> {
    let s = &record.subscriber;
    conn.execute(
        "UPDATE subscribers SET \
            ban_id = ?1, \
            plan = COALESCE(?2, plan), \
            monthly_value = COALESCE(?3, monthly_value), \
            remaining_payments = COALESCE(?4, remaining_payments), \
            contract_term = COALESCE(?5, contract_term), \
            contract_end_date = COALESCE(?6, contract_end_date), \
            updated_at = datetime('now') \
         WHERE id = ?7",
        rusqlite::params![
            ban_id,
            s.plan,
            s.monthly_value.as_deref().map(parse_amount),
            s.remaining_payments.as_deref().map(parse_count),
            s.contract_term.as_deref().map(parse_count),
            s.contract_end_date,
            id,
        ],
    )?;
    Ok(())
}

fn record_sale(
    conn: &Connection,
    client_id: i64,
    is_new_line: bool,
    amount: f64,
    sales: &mut SalesLedger,
) -> Result<()> {
    if !sales.contains_key(&client_id) {
        let (name, vendor_id): (String, Option<i64>) = conn.query_row(
            "SELECT name, vendor_id FROM clients WHERE id = ?1",
            [client_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        sales.insert(
            client_id,
            SalesAggregate {
                vendor_id,
                company_name: name,
                ..Default::default()
            },
        );
    }
    let entry = sales.get_mut(&client_id).unwrap();
    if is_new_line {
        entry.new_lines += 1;
    } else {
        entry.renewed_lines += 1;
    }
    entry.total_amount += amount;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::matcher::match_record;
    use crate::models::MappedRecord;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn record(name: &str, ban: &str, phone: &str, plan: &str, value: &str) -> MappedRecord {
        let mut r = MappedRecord::default();
        let set = |s: &str| (!s.is_empty()).then(|| s.to_string());
        r.client.name = set(name);
        r.account.number = set(ban);
        r.subscriber.phone = set(phone);
        r.subscriber.plan = set(plan);
        r.subscriber.monthly_value = set(value);
        r
    }

    fn apply(conn: &Connection, rec: &MappedRecord, sales: &mut SalesLedger) -> RowOutcome {
        let decisions = match_record(conn, rec).unwrap();
        apply_row(conn, rec, &decisions, sales).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$54.99"), 54.99);
        assert_eq!(parse_amount("1,234.56"), 1234.56);
        assert_eq!(parse_amount("(25.00)"), -25.0);
        assert_eq!(parse_amount("gratis"), 0.0);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("24 meses"), 24);
        assert_eq!(parse_count("12"), 12);
        assert_eq!(parse_count("n/a"), 0);
    }

    #[test]
    fn test_fresh_row_creates_all_three_entities() {
        let (_dir, conn) = test_db();
        let mut sales = SalesLedger::new();
        let outcome = apply(&conn, &record("Acme", "999", "5550001", "Basic", "54.99"), &mut sales);
        assert_eq!(outcome, RowOutcome::Created);

        let clients: i64 = conn.query_row("SELECT count(*) FROM clients", [], |r| r.get(0)).unwrap();
        let bans: i64 = conn.query_row("SELECT count(*) FROM bans", [], |r| r.get(0)).unwrap();
        let subs: i64 = conn.query_row("SELECT count(*) FROM subscribers", [], |r| r.get(0)).unwrap();
        assert_eq!((clients, bans, subs), (1, 1, 1));

        let status: String = conn.query_row("SELECT status FROM bans", [], |r| r.get(0)).unwrap();
        assert_eq!(status, "activo");
    }

    #[test]
    fn test_blank_update_never_clobbers() {
        let (_dir, conn) = test_db();
        let mut sales = SalesLedger::new();
        apply(&conn, &record("Acme", "999", "5550001", "Plan A", "54.99"), &mut sales);

        // Narrow re-import: same line, no plan, no value.
        let outcome = apply(&conn, &record("Acme", "999", "5550001", "", ""), &mut sales);
        assert_eq!(outcome, RowOutcome::Updated);

        let (plan, value): (String, f64) = conn
            .query_row("SELECT plan, monthly_value FROM subscribers", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(plan, "Plan A");
        assert_eq!(value, 54.99);
    }

    #[test]
    fn test_non_blank_update_wins() {
        let (_dir, conn) = test_db();
        let mut sales = SalesLedger::new();
        apply(&conn, &record("Acme", "999", "5550001", "Plan A", "54.99"), &mut sales);
        apply(&conn, &record("Acme", "999", "5550001", "Plan B", ""), &mut sales);
        let plan: String = conn.query_row("SELECT plan FROM subscribers", [], |r| r.get(0)).unwrap();
        assert_eq!(plan, "Plan B");
    }

    #[test]
    fn test_missing_ban_row_is_skipped_but_client_lands() {
        let (_dir, conn) = test_db();
        let mut sales = SalesLedger::new();
        let outcome = apply(&conn, &record("Acme", "", "5550001", "", ""), &mut sales);
        assert!(matches!(outcome, RowOutcome::Skipped(_)));
        let clients: i64 = conn.query_row("SELECT count(*) FROM clients", [], |r| r.get(0)).unwrap();
        let subs: i64 = conn.query_row("SELECT count(*) FROM subscribers", [], |r| r.get(0)).unwrap();
        assert_eq!((clients, subs), (1, 0));
    }

    #[test]
    fn test_cancelled_status_lands_on_ban() {
        let (_dir, conn) = test_db();
        let mut sales = SalesLedger::new();
        let mut rec = record("Acme", "999", "", "", "");
        rec.account.status = Some("C".to_string());
        apply(&conn, &rec, &mut sales);
        let (status, active): (String, i64) = conn
            .query_row("SELECT status, is_active FROM bans", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(status, "cancelado");
        assert_eq!(active, 0);
    }

    #[test]
    fn test_duplicate_key_race_fails_row_and_aborts_subscriber() {
        let (_dir, conn) = test_db();
        let mut sales = SalesLedger::new();
        let rec = record("Acme", "999", "5550001", "Basic", "");

        // Decide while the BAN does not exist yet, then lose the race.
        let decisions = match_record(&conn, &rec).unwrap();
        assert_eq!(decisions.account, MatchDecision::Create);
        apply(&conn, &rec, &mut sales);

        let outcome = apply_row(&conn, &rec, &decisions, &mut sales).unwrap();
        assert!(matches!(outcome, RowOutcome::Failed(ref m) if m.starts_with("account:")));
        // The stale Create decision must not have produced a second line.
        let subs: i64 = conn.query_row("SELECT count(*) FROM subscribers", [], |r| r.get(0)).unwrap();
        assert_eq!(subs, 1);
    }

    #[test]
    fn test_sales_ledger_accumulates_per_client() {
        let (_dir, conn) = test_db();
        let mut sales = SalesLedger::new();
        apply(&conn, &record("Acme", "999", "5550001", "A", "30"), &mut sales);
        apply(&conn, &record("Acme", "999", "5550002", "B", "20"), &mut sales);
        // Renewal of the first line.
        apply(&conn, &record("Acme", "999", "5550001", "", "5"), &mut sales);

        assert_eq!(sales.len(), 1);
        let agg = sales.values().next().unwrap();
        assert_eq!(agg.company_name, "Acme");
        assert_eq!(agg.new_lines, 2);
        assert_eq!(agg.renewed_lines, 1);
        assert!((agg.total_amount - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_vendor_attribution_on_create() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO vendors (name) VALUES ('Hernan')", []).unwrap();
        let mut sales = SalesLedger::new();
        let mut rec = record("Acme", "999", "5550001", "A", "30");
        rec.client.owner_name = Some("hernan".to_string());
        apply(&conn, &rec, &mut sales);

        let vendor_id: Option<i64> = conn
            .query_row("SELECT vendor_id FROM clients", [], |r| r.get(0))
            .unwrap();
        assert_eq!(vendor_id, Some(1));
        assert_eq!(sales.values().next().unwrap().vendor_id, Some(1));
    }

    #[test]
    fn test_existing_vendor_is_not_overwritten() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO vendors (name) VALUES ('Hernan')", []).unwrap();
        conn.execute("INSERT INTO vendors (name) VALUES ('Maria')", []).unwrap();
        let mut sales = SalesLedger::new();

        let mut first = record("Acme", "999", "5550001", "A", "30");
        first.client.owner_name = Some("Hernan".to_string());
        apply(&conn, &first, &mut sales);

        let mut second = record("Acme", "999", "5550002", "B", "20");
        second.client.owner_name = Some("Maria".to_string());
        apply(&conn, &second, &mut sales);

        let vendor_id: Option<i64> = conn
            .query_row("SELECT vendor_id FROM clients", [], |r| r.get(0))
            .unwrap();
        assert_eq!(vendor_id, Some(1));
    }
}
