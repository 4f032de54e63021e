use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::config::{ConfigPaths, StorageOptions};

mod persist;
mod schema;

pub use persist::{LoadReport, PersistenceAdapter, FOLDERS_KEY, NOTES_KEY, THEME_KEY};

/// Whole-value text storage addressed by key.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: IndexMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Key-value store in an SQLite file. Each call opens its own connection.
#[derive(Clone)]
pub struct SqliteStore {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl SqliteStore {
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("reading key '{key}'"))
        })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.with_connection(|conn| {
            let now = OffsetDateTime::now_utc().unix_timestamp();
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .with_context(|| format!("writing key '{key}'"))?;
            Ok(())
        })
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<SqliteStore> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    Ok(SqliteStore {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_storage() -> Result<(TempDir, SqliteStore)> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        paths.ensure_directories()?;
        let store = init(&paths, &StorageOptions::default())?;
        Ok((temp, store))
    }

    #[test]
    fn sqlite_store_overwrites_whole_values() -> Result<()> {
        let (_temp, mut store) = init_storage()?;
        assert_eq!(store.get("notes")?, None);

        store.set("notes", "[1]")?;
        store.set("notes", "[1,2]")?;
        store.set("theme", "sakura")?;

        assert_eq!(store.get("notes")?.as_deref(), Some("[1,2]"));
        let rows: i64 = store.with_connection(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?)
        })?;
        assert_eq!(rows, 2);
        Ok(())
    }

    #[test]
    fn sqlite_store_survives_reopen() -> Result<()> {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted_at(temp.path());
        {
            let mut store = init(&paths, &StorageOptions::default())?;
            store.set("folders", "[\"Work\"]")?;
        }
        let reopened = init(&paths, &StorageOptions::default())?;
        assert_eq!(reopened.path(), paths.database_path.as_path());
        assert_eq!(reopened.get("folders")?.as_deref(), Some("[\"Work\"]"));
        Ok(())
    }

    #[test]
    fn memory_store_keeps_insertion_order() -> Result<()> {
        let mut store = MemoryStore::new();
        store.set("b", "1")?;
        store.set("a", "2")?;
        store.set("b", "3")?;
        assert_eq!(store.get("b")?.as_deref(), Some("3"));
        assert_eq!(store.get("missing")?, None);
        Ok(())
    }
}
