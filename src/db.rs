use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::store::{Dataset, KeyValueStore};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS key_values (
            store      TEXT NOT NULL,
            key        TEXT NOT NULL,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (store, key)
        );

        -- Append-only: rows are only ever inserted
        CREATE TABLE IF NOT EXISTS dataset_items (
            id         INTEGER PRIMARY KEY,
            dataset    TEXT NOT NULL,
            data       TEXT NOT NULL,
            pushed_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_items_dataset ON dataset_items(dataset, id);
        ",
    )?;
    Ok(())
}

// ── Key-value store ──

pub struct SqliteKeyValueStore<'c> {
    conn: &'c Connection,
    store: String,
}

impl<'c> SqliteKeyValueStore<'c> {
    pub fn open(conn: &'c Connection, store: &str) -> Self {
        Self {
            conn,
            store: store.to_string(),
        }
    }
}

impl KeyValueStore for SqliteKeyValueStore<'_> {
    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM key_values WHERE store = ?1 AND key = ?2",
                params![self.store, key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .with_context(|| format!("Corrupt JSON under {}/{}", self.store, key))
    }

    fn set_value(&self, key: &str, value: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO key_values (store, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(store, key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![self.store, key, value.to_string()],
        )?;
        Ok(())
    }
}

// ── Datasets ──

pub struct SqliteDataset<'c> {
    conn: &'c Connection,
    name: String,
}

impl<'c> SqliteDataset<'c> {
    pub fn open(conn: &'c Connection, name: &str) -> Self {
        Self {
            conn,
            name: name.to_string(),
        }
    }
}

impl Dataset for SqliteDataset<'_> {
    fn push_data(&self, record: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO dataset_items (dataset, data) VALUES (?1, ?2)",
            params![self.name, record.to_string()],
        )?;
        Ok(())
    }
}

/// The last `limit` items of a dataset (all when `None`), oldest first.
pub fn fetch_items(conn: &Connection, dataset: &str, limit: Option<usize>) -> Result<Vec<Value>> {
    let limit = limit.map(|n| n as i64).unwrap_or(-1);
    let mut stmt = conn.prepare(
        "SELECT data FROM (
             SELECT id, data FROM dataset_items WHERE dataset = ?1 ORDER BY id DESC LIMIT ?2
         ) ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![dataset, limit], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.iter()
        .map(|s| serde_json::from_str(s).context("Corrupt JSON in dataset"))
        .collect()
}

pub fn count_items(conn: &Connection, dataset: &str) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM dataset_items WHERE dataset = ?1",
        params![dataset],
        |row| row.get(0),
    )?;
    Ok(n as usize)
}
