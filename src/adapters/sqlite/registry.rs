use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use crate::domain::recipient::ChatId;
use crate::ports::{RegistryError, SubscribeOutcome, SubscriberRegistry, UnsubscribeOutcome};

pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS subscribers (chat_id INTEGER PRIMARY KEY)";

/// Subscriber registry over a single serialized SQLite connection.
///
/// Statements run in autocommit mode, so every write is durable by the time
/// the call returns. Insert and delete are single statements, which makes
/// the Added/AlreadyPresent and Removed/NotPresent answers race-free.
#[derive(Debug, Clone)]
pub struct SqliteSubscriberRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSubscriberRegistry {
    /// Open (or create) the database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                RegistryError::Storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path).map_err(storage)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, RegistryError> {
        Self::with_connection(Connection::open_in_memory().map_err(storage)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, RegistryError> {
        conn.execute(SCHEMA, []).map_err(storage)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `op` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, op: F) -> Result<T, RegistryError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| RegistryError::Storage("connection mutex poisoned".into()))?;
            op(&*guard).map_err(storage)
        })
        .await
        .map_err(|e| RegistryError::Task(e.to_string()))?
    }
}

fn storage(e: rusqlite::Error) -> RegistryError {
    RegistryError::Storage(e.to_string())
}

#[async_trait]
impl SubscriberRegistry for SqliteSubscriberRegistry {
    async fn subscribe(&self, id: ChatId) -> Result<SubscribeOutcome, RegistryError> {
        let changed = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO subscribers (chat_id) VALUES (?1)",
                    params![id.as_i64()],
                )
            })
            .await?;

        Ok(if changed == 1 {
            tracing::info!(chat_id = %id, "Subscriber added");
            SubscribeOutcome::Added
        } else {
            SubscribeOutcome::AlreadyPresent
        })
    }

    async fn unsubscribe(&self, id: ChatId) -> Result<UnsubscribeOutcome, RegistryError> {
        let changed = self
            .with_conn(move |conn| {
                conn.execute("DELETE FROM subscribers WHERE chat_id = ?1", params![id.as_i64()])
            })
            .await?;

        Ok(if changed == 1 {
            tracing::info!(chat_id = %id, "Subscriber removed");
            UnsubscribeOutcome::Removed
        } else {
            UnsubscribeOutcome::NotPresent
        })
    }

    async fn list_all(&self) -> Result<Vec<ChatId>, RegistryError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT chat_id FROM subscribers")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .map(|id| id.map(ChatId))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn count(&self) -> Result<usize, RegistryError> {
        let count = self
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM subscribers", [], |row| row.get::<_, i64>(0))
            })
            .await?;
        Ok(count as usize)
    }
}
