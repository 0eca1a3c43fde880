//! Conversation sessions and their persisted transcripts.
//!
//! A session groups the turns of one conversation; each completed turn adds
//! a human row and an assistant row. Only user-facing text is persisted, and
//! never tool traffic. The [`SessionStore`] trait is the boundary the ask
//! service talks through; implementations cover in-memory (tests, dev) and
//! SQLite (single-process deployments).

mod memory;
mod sqlite;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ask_protocol::AnswerSource;

use crate::message::{HistoryEntry, Role};

/// One conversation session. `name` stays `None` until the background titler
/// or an explicit rename sets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One persisted transcript row.
///
/// `source` is set on assistant rows of tool-backed answers; human rows and
/// plain chat answers leave it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Error from [`SessionStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("session store error: {0}")]
    Backend(String),
}

/// Store for sessions and their transcripts.
///
/// History and message listings are chronological (oldest first); session
/// listings are newest first, the order a conversation sidebar renders.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the session with `id`, or a freshly created one when `id` is
    /// absent. An unknown id also creates a fresh session (with its own new
    /// id) instead of resurrecting the requested one.
    async fn get_or_create(&self, id: Option<&str>) -> Result<Session, SessionStoreError>;

    /// Looks up one session.
    async fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError>;

    /// All sessions, newest first.
    async fn list(&self) -> Result<Vec<Session>, SessionStoreError>;

    /// The last `limit` rows of a session's transcript, oldest first. An
    /// unknown session yields an empty history.
    async fn load_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, SessionStoreError>;

    /// Full transcript of a session, oldest first. Unlike `load_history`
    /// this distinguishes "no messages yet" from "no such session".
    async fn messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, SessionStoreError>;

    /// Appends one completed turn: a human row with `query`, then an
    /// assistant row with `answer` and its source classification.
    async fn save_turn(
        &self,
        session_id: &str,
        query: &str,
        answer: &str,
        source: Option<AnswerSource>,
    ) -> Result<(), SessionStoreError>;

    /// Sets the display name, returning the updated session.
    async fn set_name(&self, session_id: &str, name: &str) -> Result<Session, SessionStoreError>;

    /// Deletes a session and all its messages.
    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError>;
}
