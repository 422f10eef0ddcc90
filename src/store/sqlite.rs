//! Local SQLite backend.
//!
//! Holds the `items` table in a single file (or in memory). Access is
//! serialized through a mutex and every call runs on the blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, Row};

use super::{contains_pattern, ItemStore, StoreError};
use crate::item::types::{Item, ItemId, Metadata, NewItem, DEFAULT_SESSION};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    content TEXT NOT NULL,
    source TEXT NOT NULL,
    session_id TEXT NOT NULL DEFAULT 'default',
    importance_score REAL NOT NULL CHECK(importance_score >= 0.0 AND importance_score <= 1.0),
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_items_session ON items(session_id);
CREATE INDEX IF NOT EXISTS idx_items_type ON items(type);
"#;

const ITEM_COLUMNS: &str = "id, type, content, source, session_id, importance_score, metadata";

/// Item store on a local SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and make sure the table exists.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(5000))?;
        init_schema(&conn).context("failed to initialize schema")?;

        tracing::info!(path = %path.display(), "item database ready");
        Ok(Self::from_connection(conn))
    }

    /// Fresh in-memory database, mostly for tests.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        init_schema(&conn).context("failed to initialize schema")?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Number of rows in `items`.
    pub async fn count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
    }

    /// Every row, oldest first.
    pub async fn all(&self) -> Result<Vec<Item>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM items ORDER BY created_at, rowid"
            ))?;
            let rows = stmt
                .query_map([], item_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Task(format!("db lock poisoned: {e}")))?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    register_functions(conn)?;
    conn.execute_batch(SCHEMA_SQL)
}

/// `lower_unicode(text)`: full Unicode lowercasing. The built-in `LIKE` only
/// folds ASCII, so both sides of the content match go through this first.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "lower_unicode",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let metadata: Option<String> = row.get(6)?;
    // Rows are only written by this module, so the JSON is ours; a row that
    // fails to parse is read back without metadata.
    let metadata = metadata.and_then(|m| serde_json::from_str::<Metadata>(&m).ok());

    Ok(Item {
        id: Some(ItemId::Text(row.get(0)?)),
        item_type: Some(row.get(1)?),
        content: row.get(2)?,
        source: Some(row.get(3)?),
        session_id: Some(row.get(4)?),
        importance_score: Some(row.get(5)?),
        metadata,
    })
}

#[async_trait]
impl ItemStore for SqliteStore {
    async fn insert(&self, item: &NewItem) -> Result<Option<Item>, StoreError> {
        let id = uuid::Uuid::now_v7().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let metadata = item
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let item = item.clone();

        self.with_conn(move |conn| {
            let stored = conn.query_row(
                &format!(
                    "INSERT INTO items (id, type, content, source, session_id, importance_score, metadata, created_at) \
                     VALUES (?1, ?2, ?3, ?4, COALESCE(?5, ?6), ?7, ?8, ?9) \
                     RETURNING {ITEM_COLUMNS}"
                ),
                params![
                    id,
                    item.item_type,
                    item.content,
                    item.source,
                    item.session_id,
                    DEFAULT_SESSION,
                    item.importance_score,
                    metadata,
                    now,
                ],
                item_from_row,
            )?;
            Ok(Some(stored))
        })
        .await
    }

    async fn search_content(&self, needle: &str, limit: usize) -> Result<Vec<Item>, StoreError> {
        let pattern = contains_pattern(needle);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM items \
                 WHERE lower_unicode(content) LIKE lower_unicode(?1) ESCAPE '\\' LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(params![pattern, limit], item_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn probe(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM items LIMIT 1", [], |row| {
                row.get::<_, i64>(0)
            })?;
            Ok(())
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
