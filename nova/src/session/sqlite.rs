//! SQLite-backed session store. Persistent across restarts.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use ask_protocol::AnswerSource;

use crate::message::{HistoryEntry, Role};
use crate::session::{Session, SessionStore, SessionStoreError, StoredMessage};

/// SQLite-backed store: tables `sessions (id, name, created_at)` and
/// `messages (seq, id, session_id, role, content, source, created_at)`.
/// `seq` is auto-increment and defines transcript order.
pub struct SqliteSessionStore {
    db_path: std::path::PathBuf,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, SessionStoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SessionStoreError::Backend(format!("bad timestamp {raw:?}: {e}")))
}

fn open(db_path: &Path) -> Result<Connection, SessionStoreError> {
    Connection::open(db_path).map_err(|e| SessionStoreError::Backend(e.to_string()))
}

fn select_session(conn: &Connection, id: &str) -> Result<Option<Session>, SessionStoreError> {
    let row: Option<(String, Option<String>, String)> = conn
        .query_row(
            "SELECT id, name, created_at FROM sessions WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
    row.map(|(id, name, created_at)| {
        Ok(Session {
            id,
            name,
            created_at: parse_timestamp(&created_at)?,
        })
    })
    .transpose()
}

fn insert_session(conn: &Connection) -> Result<Session, SessionStoreError> {
    let session = Session {
        id: Uuid::new_v4().to_string(),
        name: None,
        created_at: Utc::now(),
    };
    conn.execute(
        "INSERT INTO sessions (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![session.id, session.name, session.created_at.to_rfc3339()],
    )
    .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
    Ok(session)
}

impl SqliteSessionStore {
    /// Creates the store and ensures the tables exist. `path` is the SQLite
    /// file path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SessionStoreError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = open(&db_path)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                name TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                source TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_session_id ON messages(session_id)",
            [],
        )
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
        Ok(Self { db_path })
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get_or_create(&self, id: Option<&str>) -> Result<Session, SessionStoreError> {
        let id = id.map(str::to_string);
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&db_path)?;
            if let Some(id) = id {
                if let Some(session) = select_session(&conn, &id)? {
                    return Ok(session);
                }
            }
            insert_session(&conn)
        })
        .await
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        let id = id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&db_path)?;
            select_session(&conn, &id)
        })
        .await
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?
    }

    async fn list(&self) -> Result<Vec<Session>, SessionStoreError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&db_path)?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, created_at FROM sessions \
                     ORDER BY created_at DESC, rowid DESC",
                )
                .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                let (id, name, created_at) =
                    row.map_err(|e| SessionStoreError::Backend(e.to_string()))?;
                out.push(Session {
                    id,
                    name,
                    created_at: parse_timestamp(&created_at)?,
                });
            }
            Ok(out)
        })
        .await
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?
    }

    async fn load_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, SessionStoreError> {
        let session_id = session_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&db_path)?;
            let mut stmt = conn
                .prepare(
                    "SELECT role, content FROM messages WHERE session_id = ?1 \
                     ORDER BY seq DESC LIMIT ?2",
                )
                .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(params![session_id, limit as i64], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                let (role, content) =
                    row.map_err(|e| SessionStoreError::Backend(e.to_string()))?;
                out.push(HistoryEntry::new(Role::parse(&role), content));
            }
            // Fetched newest-first for the LIMIT; callers want them in
            // conversation order.
            out.reverse();
            Ok(out)
        })
        .await
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?
    }

    async fn messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, SessionStoreError> {
        let session_id = session_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&db_path)?;
            if select_session(&conn, &session_id)?.is_none() {
                return Err(SessionStoreError::NotFound(session_id));
            }
            let mut stmt = conn
                .prepare(
                    "SELECT id, role, content, source, created_at FROM messages \
                     WHERE session_id = ?1 ORDER BY seq ASC",
                )
                .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            let rows = stmt
                .query_map(params![session_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })
                .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                let (id, role, content, source, created_at) =
                    row.map_err(|e| SessionStoreError::Backend(e.to_string()))?;
                out.push(StoredMessage {
                    id,
                    role: Role::parse(&role),
                    content,
                    source,
                    created_at: parse_timestamp(&created_at)?,
                });
            }
            Ok(out)
        })
        .await
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?
    }

    async fn save_turn(
        &self,
        session_id: &str,
        query: &str,
        answer: &str,
        source: Option<AnswerSource>,
    ) -> Result<(), SessionStoreError> {
        let session_id = session_id.to_string();
        let query = query.to_string();
        let answer = answer.to_string();
        let source = source.map(|s| s.as_str().to_string());
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = open(&db_path)?;
            let tx = conn
                .transaction()
                .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            let now = Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO messages (id, session_id, role, content, source, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    session_id,
                    Role::Human.as_str(),
                    query,
                    Option::<String>::None,
                    now
                ],
            )
            .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            tx.execute(
                "INSERT INTO messages (id, session_id, role, content, source, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    Uuid::new_v4().to_string(),
                    session_id,
                    Role::Assistant.as_str(),
                    answer,
                    source,
                    now
                ],
            )
            .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            tx.commit()
                .map_err(|e| SessionStoreError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?
    }

    async fn set_name(&self, session_id: &str, name: &str) -> Result<Session, SessionStoreError> {
        let session_id = session_id.to_string();
        let name = name.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&db_path)?;
            let updated = conn
                .execute(
                    "UPDATE sessions SET name = ?1 WHERE id = ?2",
                    params![name, session_id],
                )
                .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            if updated == 0 {
                return Err(SessionStoreError::NotFound(session_id));
            }
            select_session(&conn, &session_id)?
                .ok_or(SessionStoreError::NotFound(session_id))
        })
        .await
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        let session_id = session_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = open(&db_path)?;
            let tx = conn
                .transaction()
                .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            tx.execute(
                "DELETE FROM messages WHERE session_id = ?1",
                params![session_id],
            )
            .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            let deleted = tx
                .execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
                .map_err(|e| SessionStoreError::Backend(e.to_string()))?;
            if deleted == 0 {
                return Err(SessionStoreError::NotFound(session_id));
            }
            tx.commit()
                .map_err(|e| SessionStoreError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| SessionStoreError::Backend(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    /// **Scenario**: a saved turn survives a store reopen from the same path.
    #[tokio::test]
    async fn turns_persist_across_reopen() {
        let file = NamedTempFile::new().unwrap();
        let session_id = {
            let store = SqliteSessionStore::new(file.path()).unwrap();
            let session = store.get_or_create(None).await.unwrap();
            store
                .save_turn(
                    &session.id,
                    "tell me a joke",
                    "Why do programmers prefer dark mode? Because light attracts bugs!",
                    Some(AnswerSource::McpJoke),
                )
                .await
                .unwrap();
            session.id
        };

        let store = SqliteSessionStore::new(file.path()).unwrap();
        let rows = store.messages(&session_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role, Role::Human);
        assert_eq!(rows[1].source.as_deref(), Some("mcp_joke"));
    }

    /// **Scenario**: an unknown id creates a fresh session with a new id.
    #[tokio::test]
    async fn unknown_id_creates_fresh_session() {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteSessionStore::new(file.path()).unwrap();
        let session = store.get_or_create(Some("gone")).await.unwrap();
        assert_ne!(session.id, "gone");
        assert!(store.get("gone").await.unwrap().is_none());
        assert!(store.get(&session.id).await.unwrap().is_some());
    }

    /// **Scenario**: history is windowed to the last rows in conversation
    /// order, matching what the router and responders expect.
    #[tokio::test]
    async fn history_window_is_chronological() {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteSessionStore::new(file.path()).unwrap();
        let session = store.get_or_create(None).await.unwrap();
        for i in 0..12 {
            store
                .save_turn(&session.id, &format!("q{i}"), &format!("a{i}"), None)
                .await
                .unwrap();
        }

        let history = store.load_history(&session.id, 20).await.unwrap();
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].content, "q2");
        assert_eq!(history[0].role, Role::Human);
        assert_eq!(history[18].content, "q11");
        assert_eq!(history[19].content, "a11");
    }

    /// **Scenario**: sessions list newest first; renamed names stick; delete
    /// removes the session and its rows.
    #[tokio::test]
    async fn list_rename_delete_flow() {
        let file = NamedTempFile::new().unwrap();
        let store = SqliteSessionStore::new(file.path()).unwrap();
        let first = store.get_or_create(None).await.unwrap();
        let second = store.get_or_create(None).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed.last().unwrap().id, first.id);

        let renamed = store.set_name(&second.id, "Circle area").await.unwrap();
        assert_eq!(renamed.name.as_deref(), Some("Circle area"));

        store.save_turn(&second.id, "q", "a", None).await.unwrap();
        store.delete(&second.id).await.unwrap();
        assert!(store.get(&second.id).await.unwrap().is_none());
        assert!(matches!(
            store.messages(&second.id).await,
            Err(SessionStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&second.id).await,
            Err(SessionStoreError::NotFound(_))
        ));
    }
}
