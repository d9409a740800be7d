//! SQLite transaction source.
//!
//! RULE: Only store.rs talks to the database.
//! The pipeline itself never persists anything; the store only feeds it.
//!
//! Timestamps are RFC 3339 text. Rows written here use `format_timestamp`;
//! caller-owned tables may carry any precision or UTC offset, so window
//! filters and ordering compare `julianday()` instants, never raw text.

use crate::{
    config::TransactionColumns,
    error::{RfmError, RfmResult},
    metrics::{AnalysisWindow, TransactionRecord},
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Value, Connection, Row};

pub struct TransactionStore {
    conn: Connection,
}

impl TransactionStore {
    /// Open (or create) a transaction database at `path`.
    pub fn open(path: &str) -> RfmResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only matters for real files; in-memory databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RfmResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Create the default `transactions` table.
    pub fn migrate(&self) -> RfmResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_transactions.sql"))?;
        Ok(())
    }

    // ── Writes ─────────────────────────────────────────────────

    pub fn insert_transaction(&self, txn: &TransactionRecord) -> RfmResult<()> {
        self.conn.execute(
            "INSERT INTO transactions (customer_id, amount, ts) VALUES (?1, ?2, ?3)",
            params![&txn.unit_id, txn.amount, format_timestamp(txn.timestamp)],
        )?;
        Ok(())
    }

    /// Insert a batch in a single SQLite transaction.
    pub fn insert_transactions(&self, txns: &[TransactionRecord]) -> RfmResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions (customer_id, amount, ts) VALUES (?1, ?2, ?3)",
            )?;
            for txn in txns {
                stmt.execute(params![&txn.unit_id, txn.amount, format_timestamp(txn.timestamp)])?;
            }
        }
        tx.commit()?;
        Ok(txns.len())
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn transaction_count(&self, columns: &TransactionColumns) -> RfmResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&columns.table));
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    /// Every row of the configured table.
    pub fn load_transactions(
        &self,
        columns: &TransactionColumns,
    ) -> RfmResult<Vec<TransactionRecord>> {
        let sql = format!(
            "{} ORDER BY julianday({})",
            select_sql(columns),
            quote_ident(&columns.timestamp)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        into_records(rows)
    }

    /// Rows whose timestamp falls inside `window`, bounds inclusive.
    ///
    /// SQL narrows by `julianday()` with a one-second margin, since its
    /// float day count cannot resolve microseconds; the exact bounds are
    /// then applied to the parsed instants.
    pub fn load_window(
        &self,
        columns: &TransactionColumns,
        window: &AnalysisWindow,
    ) -> RfmResult<Vec<TransactionRecord>> {
        let ts = quote_ident(&columns.timestamp);
        let sql = format!(
            "{} WHERE julianday({ts})
                 BETWEEN julianday(?1, '-1 seconds') AND julianday(?2, '+1 seconds')
             ORDER BY julianday({ts})",
            select_sql(columns)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![format_timestamp(window.start()), format_timestamp(window.now())],
                read_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        let records: Vec<TransactionRecord> = into_records(rows)?
            .into_iter()
            .filter(|t| window.contains(t.timestamp))
            .collect();
        log::debug!("store: {} rows in window", records.len());
        Ok(records)
    }
}

/// Canonical stored form: `2024-06-30T12:00:00.000000Z`.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> RfmResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| RfmError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })
}

fn select_sql(columns: &TransactionColumns) -> String {
    format!(
        "SELECT {}, {}, {} FROM {}",
        quote_ident(&columns.unit_id),
        quote_ident(&columns.amount),
        quote_ident(&columns.timestamp),
        quote_ident(&columns.table)
    )
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

type RawRow = (String, f64, String);

/// `None` for rows without a customer id; they belong to no customer.
fn read_row(row: &Row<'_>) -> rusqlite::Result<Option<RawRow>> {
    // Integer ids are accepted and stringified.
    let unit_id = match row.get::<_, Value>(0)? {
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(b) => String::from_utf8_lossy(&b).into_owned(),
        Value::Null => return Ok(None),
    };
    Ok(Some((unit_id, row.get(1)?, row.get(2)?)))
}

fn into_records(rows: Vec<Option<RawRow>>) -> RfmResult<Vec<TransactionRecord>> {
    let total = rows.len();
    let records = rows
        .into_iter()
        .flatten()
        .map(|(unit_id, amount, ts)| {
            Ok(TransactionRecord {
                unit_id,
                amount,
                timestamp: parse_timestamp(&ts)?,
            })
        })
        .collect::<RfmResult<Vec<_>>>()?;
    if records.len() < total {
        log::warn!("store: skipped {} rows with NULL customer id", total - records.len());
    }
    Ok(records)
}
