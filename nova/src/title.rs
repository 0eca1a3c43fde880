//! Background conversation titling.
//!
//! After the first completed turn a session gets a short generated name.
//! The request path never waits for this: it enqueues a job on the
//! [`TitleWorker`] queue and moves on, and every failure stays inside the
//! worker as a log line.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::agent::prompts::TITLE_PROMPT;
use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::session::{Session, SessionStore};

/// Name used when the model returns nothing usable.
pub const DEFAULT_SESSION_NAME: &str = "New Conversation";

/// Cap per input side; the title never needs the whole turn.
const INPUT_CAP: usize = 300;
/// Hard cap on the stored title length.
const TITLE_CAP: usize = 80;
const QUEUE_CAPACITY: usize = 32;

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn sanitize_title(raw: &str) -> String {
    let title = raw.trim().trim_matches('"').trim_matches('\'');
    if title.is_empty() {
        return DEFAULT_SESSION_NAME.to_string();
    }
    truncate_chars(title, TITLE_CAP).to_string()
}

/// Generates a concise session title (at most 6 words) from the first turn.
pub struct TitleGenerator {
    llm: Arc<dyn LlmClient>,
}

impl TitleGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn build_messages(query: &str, answer: &str) -> [Message; 2] {
        [
            Message::system(TITLE_PROMPT),
            Message::user(format!(
                "User message: {}\nAssistant reply: {}",
                truncate_chars(query, INPUT_CAP),
                truncate_chars(answer, INPUT_CAP)
            )),
        ]
    }

    /// One title call; the reply is sanitized before use.
    pub async fn generate(&self, query: &str, answer: &str) -> Result<String, AgentError> {
        let messages = Self::build_messages(query, answer);
        let response = self.llm.invoke(&messages).await?;
        Ok(sanitize_title(&response.content))
    }
}

#[derive(Debug)]
struct TitleJob {
    session_id: String,
    query: String,
    answer: String,
}

/// Queue-fed worker that names sessions after their first turn.
///
/// Cloning shares the queue. When the queue is full the job is dropped; a
/// missed title is cosmetic and never worth backpressure on a request.
#[derive(Clone)]
pub struct TitleWorker {
    tx: mpsc::Sender<TitleJob>,
}

impl TitleWorker {
    /// Spawns the worker task and returns its queue handle.
    pub fn spawn(generator: TitleGenerator, store: Arc<dyn SessionStore>) -> Self {
        let (tx, mut rx) = mpsc::channel::<TitleJob>(QUEUE_CAPACITY);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                Self::process(&generator, store.as_ref(), job).await;
            }
        });
        Self { tx }
    }

    async fn process(generator: &TitleGenerator, store: &dyn SessionStore, job: TitleJob) {
        // The session may have been named or deleted while the job queued.
        match store.get(&job.session_id).await {
            Ok(Some(session)) if session.name.is_none() => {}
            Ok(_) => return,
            Err(err) => {
                warn!(session_id = %job.session_id, error = %err, "title job lookup failed");
                return;
            }
        }
        let title = match generator.generate(&job.query, &job.answer).await {
            Ok(title) => title,
            Err(err) => {
                warn!(session_id = %job.session_id, error = %err, "title generation failed");
                return;
            }
        };
        match store.set_name(&job.session_id, &title).await {
            Ok(_) => debug!(session_id = %job.session_id, title = %title, "session titled"),
            Err(err) => {
                warn!(session_id = %job.session_id, error = %err, "saving title failed");
            }
        }
    }

    /// Enqueues a titling job for a session that is still unnamed; sessions
    /// that already carry a name are left alone.
    pub fn enqueue(&self, session: &Session, query: &str, answer: &str) {
        if session.name.is_some() {
            return;
        }
        let job = TitleJob {
            session_id: session.id.clone(),
            query: query.to_string(),
            answer: answer.to_string(),
        };
        if self.tx.try_send(job).is_err() {
            warn!(session_id = %session.id, "title queue unavailable, dropping job");
        }
    }
}
