use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};

/// SQLite-backed store for analytics events.
#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: i64,
    pub name: String,
    pub properties: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
}

impl Store {
    pub fn open(opts: Options) -> Result<Self> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", &"WAL")
            .context("storage: set WAL")?;
        conn.pragma_update(None, "busy_timeout", &5000)
            .context("storage: set busy timeout")?;
        migrate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    pub fn insert_event(
        &self,
        name: &str,
        properties: &serde_json::Value,
        at: DateTime<Utc>,
    ) -> Result<i64> {
        if name.is_empty() {
            bail!("storage: event name required");
        }
        let serialized =
            serde_json::to_string(properties).context("storage: serialize event properties")?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO events (name, properties, created_at) VALUES (?1, ?2, ?3)",
            params![name, serialized, at.timestamp()],
        )
        .context("storage: insert event")?;
        Ok(conn.last_insert_rowid())
    }

    pub fn recent_events(&self, limit: usize) -> Result<Vec<EventRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, properties, created_at FROM events \
                 ORDER BY created_at DESC, id DESC LIMIT ?1",
            )
            .context("storage: prepare recent events")?;
        let rows = stmt
            .query_map(params![limit as i64], event_from_row)
            .context("storage: query recent events")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("storage: read event rows")?;
        Ok(rows)
    }

    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn
            .execute(
                "DELETE FROM events WHERE created_at < ?1",
                params![cutoff.timestamp()],
            )
            .context("storage: prune events")?;
        Ok(deleted)
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    properties TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_events_created_at ON events (created_at);
"#,
    )
    .context("storage: run migrations")
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    let properties: String = row.get(2)?;
    let created_at: i64 = row.get(3)?;
    Ok(EventRow {
        id: row.get(0)?,
        name: row.get(1)?,
        properties: serde_json::from_str(&properties).unwrap_or(serde_json::Value::Null),
        created_at: Utc
            .timestamp_opt(created_at, 0)
            .single()
            .unwrap_or_else(Utc::now),
    })
}

pub fn default_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("dark-kokan").join("dark-kokan.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn open_store(dir: &tempfile::TempDir) -> Store {
        Store::open(Options {
            path: Some(dir.path().join("events.db")),
        })
        .unwrap()
    }

    #[test]
    fn inserts_and_lists_events() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store
            .insert_event("tab_switch", &json!({"tab": "about"}), Utc::now())
            .unwrap();
        store
            .insert_event(
                "video_open",
                &json!({"video_id": "abc123", "title": "Title"}),
                Utc::now(),
            )
            .unwrap();

        let events = store.recent_events(10).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "video_open");
        assert_eq!(events[0].properties["video_id"], "abc123");
        assert_eq!(events[1].name, "tab_switch");
    }

    #[test]
    fn rejects_unnamed_events() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        assert!(store.insert_event("", &json!({}), Utc::now()).is_err());
    }

    #[test]
    fn prunes_old_events() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let old = Utc::now() - chrono::Duration::days(60);
        store.insert_event("tab_switch", &json!({}), old).unwrap();
        store
            .insert_event("tab_switch", &json!({}), Utc::now())
            .unwrap();

        let deleted = store
            .prune_before(Utc::now() - chrono::Duration::days(30))
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.recent_events(10).unwrap().len(), 1);
    }
}
