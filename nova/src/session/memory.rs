//! In-memory session store. Not persistent.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use ask_protocol::AnswerSource;

use crate::message::{HistoryEntry, Role};
use crate::session::{Session, SessionStore, SessionStoreError, StoredMessage};

/// In-memory store keyed by session id.
///
/// Creation order is tracked with a counter so listings stay newest-first
/// even when two sessions share a timestamp.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, (u64, Session)>,
    messages: DashMap<String, Vec<StoredMessage>>,
    next_seq: AtomicU64,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn create_session(&self) -> Session {
        let session = Session {
            id: Uuid::new_v4().to_string(),
            name: None,
            created_at: Utc::now(),
        };
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .insert(session.id.clone(), (seq, session.clone()));
        self.messages.insert(session.id.clone(), Vec::new());
        session
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_or_create(&self, id: Option<&str>) -> Result<Session, SessionStoreError> {
        if let Some(id) = id {
            if let Some(entry) = self.sessions.get(id) {
                return Ok(entry.1.clone());
            }
        }
        Ok(self.create_session())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        Ok(self.sessions.get(id).map(|entry| entry.1.clone()))
    }

    async fn list(&self) -> Result<Vec<Session>, SessionStoreError> {
        let mut rows: Vec<(u64, Session)> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(rows.into_iter().map(|(_, session)| session).collect())
    }

    async fn load_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, SessionStoreError> {
        let Some(rows) = self.messages.get(session_id) else {
            return Ok(Vec::new());
        };
        let start = rows.len().saturating_sub(limit);
        Ok(rows[start..]
            .iter()
            .map(|m| HistoryEntry::new(m.role, m.content.clone()))
            .collect())
    }

    async fn messages(&self, session_id: &str) -> Result<Vec<StoredMessage>, SessionStoreError> {
        self.messages
            .get(session_id)
            .map(|rows| rows.clone())
            .ok_or_else(|| SessionStoreError::NotFound(session_id.to_string()))
    }

    async fn save_turn(
        &self,
        session_id: &str,
        query: &str,
        answer: &str,
        source: Option<AnswerSource>,
    ) -> Result<(), SessionStoreError> {
        let mut rows = self.messages.entry(session_id.to_string()).or_default();
        let now = Utc::now();
        rows.push(StoredMessage {
            id: Uuid::new_v4().to_string(),
            role: Role::Human,
            content: query.to_string(),
            source: None,
            created_at: now,
        });
        rows.push(StoredMessage {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: answer.to_string(),
            source: source.map(|s| s.as_str().to_string()),
            created_at: now,
        });
        Ok(())
    }

    async fn set_name(&self, session_id: &str, name: &str) -> Result<Session, SessionStoreError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionStoreError::NotFound(session_id.to_string()))?;
        entry.1.name = Some(name.to_string());
        Ok(entry.1.clone())
    }

    async fn delete(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.sessions
            .remove(session_id)
            .ok_or_else(|| SessionStoreError::NotFound(session_id.to_string()))?;
        self.messages.remove(session_id);
        Ok(())
    }
}
