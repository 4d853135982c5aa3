use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{CanopyError, Result};
use crate::cache::{CacheKey, PageTier, StoredEntry};
use crate::domain::{Item, ItemId};
use crate::index::LookAside;

/// SQLite-backed persisted page tier and look-aside item index.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| CanopyError::Cache(format!("migration failed: {}", e)))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| CanopyError::Cache(format!("store lock poisoned: {}", e)))
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    /// Number of items held by the look-aside index.
    pub fn indexed_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM indexed_items", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

impl PageTier for SqliteStore {
    fn load(&self, key: &CacheKey) -> Result<Option<StoredEntry>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT payload, cached_at FROM cache_entries WHERE key = ?1",
                params![key.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((payload, cached_at)) = row else {
            return Ok(None);
        };
        let cached_at = Self::parse_datetime(&cached_at).ok_or_else(|| {
            CanopyError::Cache(format!("bad timestamp {:?} for {}", cached_at, key))
        })?;

        Ok(Some(StoredEntry { payload, cached_at }))
    }

    fn store(&self, key: &CacheKey, entry: &StoredEntry) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, payload, cached_at) VALUES (?1, ?2, ?3)",
            params![key.to_string(), entry.payload, entry.cached_at.to_rfc3339()],
        )?;

        Ok(())
    }
}

impl LookAside for SqliteStore {
    fn lookup(&self, id: ItemId) -> Result<Option<Item>> {
        let conn = self.lock()?;

        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM indexed_items WHERE id = ?1",
                params![id as i64],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    fn index_item(&self, item: &Item) -> Result<()> {
        let payload = serde_json::to_string(item)?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO indexed_items (id, kind, author, title, body, time, payload, indexed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item.id as i64,
                item.kind.as_str(),
                item.by,
                item.title,
                item.text,
                item.time,
                payload,
                Utc::now().to_rfc3339()
            ],
        )?;

        Ok(())
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<Item>> {
        let conn = self.lock()?;
        let pattern = format!("%{}%", query.trim());

        let mut stmt = conn.prepare(
            "SELECT payload FROM indexed_items
             WHERE title LIKE ?1 OR body LIKE ?1 OR author LIKE ?1
             ORDER BY time DESC, id DESC
             LIMIT ?2",
        )?;

        let payloads = stmt
            .query_map(params![pattern, limit as i64], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(CanopyError::from))
            .collect()
    }
}
