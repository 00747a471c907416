use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_i64},
    models::HistoryEntry,
};

fn row_to_entry(row: &Row) -> Result<HistoryEntry> {
    let timestamp: String = row.get("timestamp")?;

    Ok(HistoryEntry {
        id: row.get("id")?,
        detected_item: row.get("detected_item")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
    })
}

fn insert_entry(conn: &mut Connection, item: &str, at: DateTime<Utc>) -> Result<i64> {
    conn.execute(
        "INSERT INTO history (detected_item, timestamp) VALUES (?1, ?2)",
        params![item, at.to_rfc3339()],
    )
    .with_context(|| "failed to insert history entry")?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Append one entry and return its id.
    pub async fn record_history(&self, item: &str, at: DateTime<Utc>) -> Result<i64> {
        let item = item.to_string();
        self.execute(move |conn| insert_entry(conn, &item, at)).await
    }

    /// Append one entry without waiting for the write.
    pub fn record_history_detached(&self, item: &str, at: DateTime<Utc>) -> Result<()> {
        let item = item.to_string();
        self.submit("history insert", move |conn| {
            insert_entry(conn, &item, at).map(|_| ())
        })
    }

    /// Entries newest first (descending id), optionally capped at `limit`.
    pub async fn list_recent_history(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        let limit = match limit {
            Some(limit) => to_i64(limit)?,
            // SQLite treats a negative LIMIT as "no limit".
            None => -1,
        };

        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, detected_item, timestamp
                 FROM history
                 ORDER BY id DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }

            Ok(entries)
        })
        .await
    }

    /// Delete every entry whose item text equals `item` exactly. Returns how many went.
    pub async fn delete_history_item(&self, item: &str) -> Result<usize> {
        let item = item.to_string();
        self.execute(move |conn| {
            let removed = conn
                .execute("DELETE FROM history WHERE detected_item = ?1", params![item])
                .with_context(|| "failed to delete history entries")?;
            Ok(removed)
        })
        .await
    }
}
