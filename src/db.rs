use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Snapshot, SNAPSHOT_VERSION};

/// Where the till keeps its snapshot between runs.
pub trait SnapshotStore: Send {
    /// `None` when nothing has been saved under this store yet.
    fn load(&self) -> Result<Option<Snapshot>>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreId(String);

impl StoreId {
    pub fn new(id: impl Into<String>) -> Self {
        StoreId(id.into())
    }

    /// The conventional per-restaurant key, `restaurant-store-<name>`.
    pub fn for_restaurant(name: &str) -> Self {
        let name = name.trim();
        let name = if name.is_empty() { "default" } else { name };
        StoreId(format!("restaurant-store-{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        debug!("Opening database at {:?}", path);
        let conn = Connection::open(path)
            .map_err(|e| Error::Database(format!("Failed to open database at {:?}: {}", path, e)))?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Database {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            -- One serialized snapshot per till store
            CREATE TABLE IF NOT EXISTS snapshots (
                store_id TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            ",
        )?;

        // Run migrations for existing databases (pass connection to avoid deadlock)
        Self::migrate_conn(&conn)?;

        info!("Database schema ready");
        Ok(())
    }

    fn migrate_conn(conn: &Connection) -> Result<()> {
        let columns: Vec<String> = conn
            .prepare("PRAGMA table_info(snapshots)")?
            .query_map([], |row| row.get::<_, String>(1))?
            .filter_map(|r| r.ok())
            .collect();

        if !columns.contains(&"version".to_string()) {
            conn.execute(
                "ALTER TABLE snapshots ADD COLUMN version INTEGER NOT NULL DEFAULT 1",
                [],
            )?;
        }

        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| Error::Database(e.to_string()))
    }
}

/// A `SnapshotStore` backed by one row of the `snapshots` table.
pub struct SqliteStore {
    db: Arc<Database>,
    store_id: StoreId,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>, store_id: StoreId) -> Self {
        SqliteStore { db, store_id }
    }

    pub fn store_id(&self) -> &StoreId {
        &self.store_id
    }
}

impl SnapshotStore for SqliteStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        let conn = self.db.lock()?;

        let row: Option<(u32, String)> = conn
            .query_row(
                "SELECT version, body FROM snapshots WHERE store_id = ?1",
                [self.store_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((version, body)) = row else {
            debug!(store = self.store_id.as_str(), "No snapshot stored yet");
            return Ok(None);
        };

        if version > SNAPSHOT_VERSION {
            return Err(Error::Database(format!(
                "Snapshot {} has version {}, newer than supported {}",
                self.store_id.as_str(),
                version,
                SNAPSHOT_VERSION
            )));
        }

        let snapshot: Snapshot = serde_json::from_str(&body)?;
        debug!(store = self.store_id.as_str(), version, "Snapshot loaded");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let body = serde_json::to_string(snapshot)?;
        let conn = self.db.lock()?;

        conn.execute(
            "INSERT INTO snapshots (store_id, version, body, updated_at)
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
             ON CONFLICT(store_id) DO UPDATE SET
                version = excluded.version,
                body = excluded.body,
                updated_at = CURRENT_TIMESTAMP",
            rusqlite::params![self.store_id.as_str(), snapshot.version, body],
        )?;

        debug!(store = self.store_id.as_str(), bytes = body.len(), "Snapshot saved");
        Ok(())
    }
}
