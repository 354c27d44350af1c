use rusqlite::Connection;

use crate::error::Result;
use crate::models::MappedRecord;

/// Trailing digits kept when normalizing a subscriber phone number.
/// Tolerates formatting differences ("555-0001" vs "5550001") and country
/// prefixes across re-imports of the same line.
pub const PHONE_KEY_DIGITS: usize = 10;

pub const SKIP_MISSING_BAN: &str = "missing account number";
pub const SKIP_MISSING_PHONE: &str = "missing subscriber phone";
pub const SKIP_MISSING_NAME: &str = "missing client name";

/// Fallback business name when a row carries a BAN but no client name.
/// An account is still more valuable than no record.
pub const PLACEHOLDER_CLIENT: &str = "SIN NOMBRE";

// ---------------------------------------------------------------------------
// Natural-key normalization
// ---------------------------------------------------------------------------

/// Client natural key: lowercase, alphanumerics only. "Acme, Corp." and
/// "ACME CORP" collapse to the same key.
pub fn normalize_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Subscriber natural key: strip non-digits, keep the trailing digits.
pub fn normalize_phone(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let start = digits.len().saturating_sub(PHONE_KEY_DIGITS);
    digits[start..].iter().collect()
}

/// BAN natural key: digits only.
pub fn normalize_ban(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Carrier spreadsheets write status as anything from "C" to "CANCELADO"
/// to "Baja"; everything that is not recognizably cancelled counts as active.
pub fn is_cancelled_status(raw: &str) -> bool {
    let s = raw.trim().to_uppercase();
    s == "C" || s == "BAJA" || s == "SUSPENDIDO" || s.starts_with("CANCEL")
}

pub fn status_label(raw: Option<&str>) -> &'static str {
    match raw {
        Some(s) if is_cancelled_status(s) => "cancelado",
        _ => "activo",
    }
}

// ---------------------------------------------------------------------------
// Row classification (shared by matcher and simulator)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass {
    Cancelled,
    Available,
    Incomplete,
}

/// Coarse per-row classification: no storage lookups, only the same
/// normalization and required-field checks the matcher applies.
pub fn classify_row(record: &MappedRecord) -> RowClass {
    if record.account.status.as_deref().is_some_and(is_cancelled_status) {
        return RowClass::Cancelled;
    }
    let has_name = record
        .client
        .name
        .as_deref()
        .map(|n| !normalize_name(n).is_empty())
        .unwrap_or(false);
    if has_name {
        RowClass::Available
    } else {
        RowClass::Incomplete
    }
}

// ---------------------------------------------------------------------------
// Match decisions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchDecision {
    Create,
    Update(i64),
    Skip(&'static str),
}

/// The matcher's verdict for one row, plus the resolved natural keys the
/// reconciler writes with.
#[derive(Debug, Clone)]
pub struct RowDecisions {
    pub client: MatchDecision,
    pub account: MatchDecision,
    pub subscriber: MatchDecision,
    /// Display name the client record is created with ("SIN NOMBRE" fallback).
    pub client_name: String,
    /// Normalized BAN number, empty when the row has none.
    pub ban_key: String,
    /// Normalized subscriber phone, empty when the row has none.
    pub phone_key: String,
}

/// Resolve one mapped row against the store. Order matters: the Account is
/// looked up first because an existing BAN's `client_id` is authoritative
/// over whatever client name this row spells — re-keying off the name would
/// fragment history when spreadsheets spell a client inconsistently.
pub fn match_record(conn: &Connection, record: &MappedRecord) -> Result<RowDecisions> {
    let ban_key = record
        .account
        .number
        .as_deref()
        .map(normalize_ban)
        .unwrap_or_default();
    let phone_key = record
        .subscriber
        .phone
        .as_deref()
        .map(normalize_phone)
        .unwrap_or_default();

    let raw_name = record.client.name.as_deref().unwrap_or("").trim();
    let has_name = !normalize_name(raw_name).is_empty();

    // 1. No BAN number: the row cannot establish an account or a line,
    //    but the client is still resolved independently.
    if ban_key.is_empty() {
        let client = if has_name {
            resolve_client_by_name(conn, raw_name)?
        } else {
            MatchDecision::Skip(SKIP_MISSING_NAME)
        };
        return Ok(RowDecisions {
            client,
            account: MatchDecision::Skip(SKIP_MISSING_BAN),
            subscriber: MatchDecision::Skip(SKIP_MISSING_BAN),
            client_name: raw_name.to_string(),
            ban_key,
            phone_key,
        });
    }

    // 2. Existing BAN wins: its client_id is authoritative and this row's
    //    client fields only enrich that client.
    let existing_ban: Option<(i64, i64)> = conn
        .query_row(
            "SELECT id, client_id FROM bans WHERE number = ?1",
            [&ban_key],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .map(Some)
        .or_else(ignore_not_found)?;

    let (client, account) = match existing_ban {
        Some((ban_id, client_id)) => (MatchDecision::Update(client_id), MatchDecision::Update(ban_id)),
        None => {
            // 3. New BAN: resolve the client by normalized name, falling back
            //    to the shared placeholder when the row has no usable name.
            let lookup_name = if has_name { raw_name } else { PLACEHOLDER_CLIENT };
            (resolve_client_by_name(conn, lookup_name)?, MatchDecision::Create)
        }
    };

    let subscriber = if phone_key.is_empty() {
        MatchDecision::Skip(SKIP_MISSING_PHONE)
    } else {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM subscribers WHERE phone = ?1",
                [&phone_key],
                |r| r.get(0),
            )
            .map(Some)
            .or_else(ignore_not_found)?;
        match existing {
            Some(id) => MatchDecision::Update(id),
            None => MatchDecision::Create,
        }
    };

    let client_name = if has_name {
        raw_name.to_string()
    } else {
        PLACEHOLDER_CLIENT.to_string()
    };

    Ok(RowDecisions {
        client,
        account,
        subscriber,
        client_name,
        ban_key,
        phone_key,
    })
}

fn resolve_client_by_name(conn: &Connection, name: &str) -> Result<MatchDecision> {
    let key = normalize_name(name);
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM clients WHERE name_key = ?1 ORDER BY id LIMIT 1",
            [&key],
            |r| r.get(0),
        )
        .map(Some)
        .or_else(ignore_not_found)?;
    Ok(match existing {
        Some(id) => MatchDecision::Update(id),
        None => MatchDecision::Create,
    })
}

fn ignore_not_found<T>(err: rusqlite::Error) -> std::result::Result<Option<T>, rusqlite::Error> {
    match err {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
    }
}
