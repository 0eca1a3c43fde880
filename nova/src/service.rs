//! Per-turn orchestration behind the ask API.
//!
//! [`AskService`] owns the compiled graph, the session store, and the title
//! worker. One call runs one turn: load the session and its history, run the
//! graph, classify the answer source from the tools that actually executed,
//! persist the finished turn, and enqueue titling for unnamed sessions.
//!
//! The streaming variant translates internal [`StreamEvent`]s into the wire
//! protocol of `ask-protocol`, holding its ordering contract regardless of
//! how the turn ends: `session`, then answer tokens, then `source` on
//! success or `error` on failure, then exactly one `done`.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use ask_protocol::{AnswerSource, AskEvent, http::AskResponse};

use crate::agent::{ChatNode, ToolCallNode};
use crate::error::AgentError;
use crate::graph::{CompiledGraph, StreamEvent};
use crate::session::{SessionStore, SessionStoreError};
use crate::state::TurnState;
use crate::title::TitleWorker;
use crate::tool_source::{JokeToolSource, MathToolSource};

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Error from one ask turn.
#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

/// Classifies a finished turn by the tools that actually ran.
///
/// Joke tools win over math tools when both ran; a turn that executed no
/// tool is plain chat. Only executed tools count — a requested call that
/// never ran (fallback path) leaves the turn classified as chat.
fn classify_source(tools_used: &[String]) -> AnswerSource {
    let used = |names: &[&str]| tools_used.iter().any(|t| names.contains(&t.as_str()));
    if used(JokeToolSource::NAMES) {
        AnswerSource::McpJoke
    } else if used(MathToolSource::NAMES) {
        AnswerSource::McpMath
    } else {
        AnswerSource::Chat
    }
}

/// Stored rows keep the source only for tool-backed answers.
fn stored_source(source: AnswerSource) -> Option<AnswerSource> {
    match source {
        AnswerSource::Chat => None,
        other => Some(other),
    }
}

/// Runs ask turns against one compiled graph and one session store.
///
/// Cloning is cheap (shared graph topology, shared store, shared title
/// queue); the HTTP layer keeps one instance per process.
#[derive(Clone)]
pub struct AskService {
    graph: CompiledGraph<TurnState>,
    store: Arc<dyn SessionStore>,
    titles: TitleWorker,
    history_limit: usize,
}

impl AskService {
    pub fn new(
        graph: CompiledGraph<TurnState>,
        store: Arc<dyn SessionStore>,
        titles: TitleWorker,
        history_limit: usize,
    ) -> Self {
        Self {
            graph,
            store,
            titles,
            history_limit,
        }
    }

    /// The session store this service persists into, for the session CRUD
    /// surface that lives beside the ask endpoints.
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Runs one turn to completion and returns the assembled answer.
    ///
    /// The turn is persisted (and titling enqueued) only when the answer is
    /// non-empty; a failed turn returns the error and writes nothing.
    pub async fn ask(&self, query: &str, session_id: Option<&str>) -> Result<AskResponse, AskError> {
        let session = self.store.get_or_create(session_id).await?;
        let history = self.store.load_history(&session.id, self.history_limit).await?;

        let state = self.graph.invoke(TurnState::new(query, history)).await?;
        let answer = state.answer.unwrap_or_default();

        if !answer.is_empty() {
            let source = classify_source(&state.tools_used);
            debug!(session_id = %session.id, %source, "turn finished");
            self.store
                .save_turn(&session.id, query, &answer, stored_source(source))
                .await?;
            self.titles.enqueue(&session, query, &answer);
        }

        Ok(AskResponse {
            answer,
            session_id: session.id,
            session_name: session.name,
        })
    }

    /// Runs one turn on a spawned task, streaming wire events as they happen.
    ///
    /// The returned stream always yields a well-formed sequence ending in
    /// `done`, even when session lookup or graph execution fails. The one
    /// case with no leading `session` event is a store that cannot create
    /// the session at all: there is no id to announce, so the stream is
    /// just `error, done`.
    pub fn ask_stream(&self, query: String, session_id: Option<String>) -> ReceiverStream<AskEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let service = self.clone();
        tokio::spawn(async move {
            service.run_stream(&query, session_id.as_deref(), &tx).await;
            let _ = tx.send(AskEvent::Done).await;
        });
        ReceiverStream::new(rx)
    }

    async fn run_stream(&self, query: &str, session_id: Option<&str>, tx: &mpsc::Sender<AskEvent>) {
        let fail = |error: String| AskEvent::Error { error };

        let session = match self.store.get_or_create(session_id).await {
            Ok(session) => session,
            Err(err) => {
                let _ = tx.send(fail(err.to_string())).await;
                return;
            }
        };
        let _ = tx
            .send(AskEvent::Session {
                session_id: session.id.clone(),
                session_name: session.name.clone(),
            })
            .await;

        let history = match self.store.load_history(&session.id, self.history_limit).await {
            Ok(history) => history,
            Err(err) => {
                let _ = tx.send(fail(err.to_string())).await;
                return;
            }
        };

        let (mut events, handle) = self.graph.stream(TurnState::new(query, history));
        while let Some(event) = events.next().await {
            match event {
                // Answer text comes only from the two responder nodes; the
                // router's classification tokens never reach the wire.
                StreamEvent::Token { node, content } => {
                    if node == ChatNode::ID || node == ToolCallNode::ID {
                        let _ = tx.send(AskEvent::Token { token: content }).await;
                    }
                }
                StreamEvent::NodeStart { .. }
                | StreamEvent::NodeEnd { .. }
                | StreamEvent::ToolStart { .. }
                | StreamEvent::ToolEnd { .. } => {}
            }
        }

        let state = match handle.await {
            Ok(Ok(state)) => state,
            Ok(Err(err)) => {
                let _ = tx.send(fail(err.to_string())).await;
                return;
            }
            Err(err) => {
                let _ = tx.send(fail(format!("turn task failed: {err}"))).await;
                return;
            }
        };

        let answer = state.answer.unwrap_or_default();
        let source = classify_source(&state.tools_used);
        let _ = tx.send(AskEvent::Source { source }).await;

        if !answer.is_empty() {
            if let Err(err) = self
                .store
                .save_turn(&session.id, query, &answer, stored_source(source))
                .await
            {
                warn!(session_id = %session.id, error = %err, "saving turn failed");
                let _ = tx.send(fail(err.to_string())).await;
                return;
            }
            self.titles.enqueue(&session, query, &answer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::build_ask_graph;
    use crate::llm::{LlmResponse, MockLlm};
    use crate::message::{HistoryEntry, Role, ToolCall};
    use crate::session::{MemorySessionStore, Session, StoredMessage};
    use crate::title::TitleGenerator;
    use crate::tool_source::ToolRegistry;

    async fn registry() -> Arc<ToolRegistry> {
        Arc::new(
            ToolRegistry::discover(vec![
                Arc::new(MathToolSource::new()),
                Arc::new(JokeToolSource::new()),
            ])
            .await
            .unwrap(),
        )
    }

    fn tool_call(name: &str, arguments: &str) -> LlmResponse {
        LlmResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
                id: Some("call_1".to_string()),
            }],
            usage: None,
        }
    }

    async fn service(
        router: MockLlm,
        chat: MockLlm,
        tool: MockLlm,
    ) -> (AskService, Arc<dyn SessionStore>) {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let graph = build_ask_graph(
            Arc::new(router),
            Arc::new(chat),
            Arc::new(tool),
            registry().await,
        )
        .unwrap();
        let titles = TitleWorker::spawn(
            TitleGenerator::new(Arc::new(MockLlm::fixed("Test title"))),
            store.clone(),
        );
        (AskService::new(graph, store.clone(), titles, 20), store)
    }

    async fn collect(stream: ReceiverStream<AskEvent>) -> Vec<AskEvent> {
        stream.collect().await
    }

    fn tokens_of(events: &[AskEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                AskEvent::Token { token } => Some(token.as_str()),
                _ => None,
            })
            .collect()
    }

    fn source_of(events: &[AskEvent]) -> Option<AnswerSource> {
        events.iter().find_map(|e| match e {
            AskEvent::Source { source } => Some(*source),
            _ => None,
        })
    }

    /// Asserts the wire contract: `session` first (when present), tokens in
    /// the middle, `source` after the last token, `done` exactly once and
    /// last.
    fn assert_well_formed(events: &[AskEvent]) {
        assert_eq!(events.last(), Some(&AskEvent::Done), "done must be last");
        let dones = events.iter().filter(|e| matches!(e, AskEvent::Done)).count();
        assert_eq!(dones, 1, "done must appear exactly once");
        if let Some(last_token) = events
            .iter()
            .rposition(|e| matches!(e, AskEvent::Token { .. }))
        {
            let source_pos = events
                .iter()
                .position(|e| matches!(e, AskEvent::Source { .. }));
            if let Some(source_pos) = source_pos {
                assert!(source_pos > last_token, "source must follow the last token");
            }
        }
    }

    /// **Scenario**: "What is 12 times 7?" routes to tools, multiplies, and
    /// streams `session, token*, source=mcp_math, done` with 84 in the text.
    #[tokio::test]
    async fn math_turn_streams_mcp_math() {
        let (service, store) = service(
            MockLlm::fixed("mcp"),
            MockLlm::failing("chat model must not run"),
            MockLlm::scripted(vec![
                tool_call("multiply", r#"{"a": 12, "b": 7}"#),
                LlmResponse {
                    content: "12 times 7 is 84.".to_string(),
                    ..LlmResponse::default()
                },
            ]),
        )
        .await;

        let events = collect(service.ask_stream("What is 12 times 7?".to_string(), None)).await;

        assert_well_formed(&events);
        assert!(matches!(events[0], AskEvent::Session { .. }));
        assert!(tokens_of(&events).contains("84"));
        assert_eq!(source_of(&events), Some(AnswerSource::McpMath));

        // The finished turn is persisted with its source.
        let session_id = match &events[0] {
            AskEvent::Session { session_id, .. } => session_id.clone(),
            _ => unreachable!(),
        };
        let rows = store.messages(&session_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].source.as_deref(), Some("mcp_math"));
    }

    /// **Scenario**: a programming-joke request classifies as mcp_joke; joke
    /// tools outrank math tools even when both ran.
    #[tokio::test]
    async fn joke_turn_streams_mcp_joke() {
        let (service, _) = service(
            MockLlm::fixed("mcp"),
            MockLlm::failing("chat model must not run"),
            MockLlm::scripted(vec![
                tool_call("get_joke_by_category", r#"{"category": "programming"}"#),
                LlmResponse {
                    content: "Here is one.".to_string(),
                    ..LlmResponse::default()
                },
            ]),
        )
        .await;

        let events = collect(service.ask_stream("Tell me a programming joke".to_string(), None)).await;
        assert_well_formed(&events);
        assert_eq!(source_of(&events), Some(AnswerSource::McpJoke));

        assert_eq!(
            classify_source(&["add".to_string(), "get_random_joke".to_string()]),
            AnswerSource::McpJoke
        );
    }

    /// **Scenario**: "How does photosynthesis work?" routes to chat; no tool
    /// traffic, source chat.
    #[tokio::test]
    async fn chat_turn_streams_chat_source() {
        let (service, _) = service(
            MockLlm::fixed("chat"),
            MockLlm::fixed("Plants convert light into chemical energy.").with_stream_by_char(),
            MockLlm::failing("tool model must not run"),
        )
        .await;

        let events = collect(
            service.ask_stream("How does photosynthesis work?".to_string(), None),
        )
        .await;

        assert_well_formed(&events);
        assert_eq!(
            tokens_of(&events),
            "Plants convert light into chemical energy."
        );
        assert_eq!(source_of(&events), Some(AnswerSource::Chat));
    }

    /// **Scenario**: a tool-format failure takes the fallback path; no tools
    /// executed, so the turn is still classified chat.
    #[tokio::test]
    async fn fallback_turn_classifies_chat() {
        let (service, _) = service(
            MockLlm::fixed("mcp"),
            MockLlm::fixed("Plain fallback answer."),
            MockLlm::failing("tool_use_failed: bad function JSON"),
        )
        .await;

        let events = collect(service.ask_stream("joke please".to_string(), None)).await;
        assert_well_formed(&events);
        assert_eq!(source_of(&events), Some(AnswerSource::Chat));
        assert_eq!(tokens_of(&events), "Plain fallback answer.");
    }

    /// **Scenario**: a router transport fault yields `session, error, done` —
    /// no tokens, no source, and nothing persisted.
    #[tokio::test]
    async fn failed_turn_streams_error_then_done() {
        let (service, store) = service(
            MockLlm::failing("connection reset by peer"),
            MockLlm::fixed("unused"),
            MockLlm::fixed("unused"),
        )
        .await;

        let events = collect(service.ask_stream("hello".to_string(), None)).await;

        assert_well_formed(&events);
        assert!(matches!(events[0], AskEvent::Session { .. }));
        assert!(tokens_of(&events).is_empty());
        assert!(source_of(&events).is_none());
        assert!(events
            .iter()
            .any(|e| matches!(e, AskEvent::Error { error } if error.contains("connection reset"))));

        let session_id = match &events[0] {
            AskEvent::Session { session_id, .. } => session_id.clone(),
            _ => unreachable!(),
        };
        assert!(store.messages(&session_id).await.unwrap().is_empty());
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl SessionStore for BrokenStore {
        async fn get_or_create(&self, _id: Option<&str>) -> Result<Session, SessionStoreError> {
            Err(SessionStoreError::Backend("store offline".to_string()))
        }
        async fn get(&self, _id: &str) -> Result<Option<Session>, SessionStoreError> {
            Err(SessionStoreError::Backend("store offline".to_string()))
        }
        async fn list(&self) -> Result<Vec<Session>, SessionStoreError> {
            Err(SessionStoreError::Backend("store offline".to_string()))
        }
        async fn load_history(
            &self,
            _session_id: &str,
            _limit: usize,
        ) -> Result<Vec<HistoryEntry>, SessionStoreError> {
            Err(SessionStoreError::Backend("store offline".to_string()))
        }
        async fn messages(&self, _session_id: &str) -> Result<Vec<StoredMessage>, SessionStoreError> {
            Err(SessionStoreError::Backend("store offline".to_string()))
        }
        async fn save_turn(
            &self,
            _session_id: &str,
            _query: &str,
            _answer: &str,
            _source: Option<AnswerSource>,
        ) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::Backend("store offline".to_string()))
        }
        async fn set_name(&self, _session_id: &str, _name: &str) -> Result<Session, SessionStoreError> {
            Err(SessionStoreError::Backend("store offline".to_string()))
        }
        async fn delete(&self, _session_id: &str) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::Backend("store offline".to_string()))
        }
    }

    /// **Scenario**: when the store cannot even create the session there is
    /// no id to announce, so the stream is just `error, done`.
    #[tokio::test]
    async fn broken_store_streams_error_then_done() {
        let store: Arc<dyn SessionStore> = Arc::new(BrokenStore);
        let graph = build_ask_graph(
            Arc::new(MockLlm::fixed("chat")),
            Arc::new(MockLlm::fixed("unused")),
            Arc::new(MockLlm::fixed("unused")),
            registry().await,
        )
        .unwrap();
        let titles = TitleWorker::spawn(
            TitleGenerator::new(Arc::new(MockLlm::fixed("unused"))),
            store.clone(),
        );
        let service = AskService::new(graph, store, titles, 20);

        let events = collect(service.ask_stream("hello".to_string(), None)).await;

        assert_eq!(events.len(), 2);
        assert!(
            matches!(&events[0], AskEvent::Error { error } if error.contains("store offline"))
        );
        assert_eq!(events[1], AskEvent::Done);
    }

    /// **Scenario**: the non-streaming path returns the assembled answer and
    /// persists the turn once.
    #[tokio::test]
    async fn ask_returns_answer_and_persists() {
        let (service, store) = service(
            MockLlm::fixed("chat"),
            MockLlm::fixed("Hello there!"),
            MockLlm::failing("tool model must not run"),
        )
        .await;

        let response = service.ask("hi", None).await.unwrap();
        assert_eq!(response.answer, "Hello there!");
        assert!(response.session_name.is_none());

        let rows = store.messages(&response.session_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].content, "hi");
        assert_eq!(rows[1].content, "Hello there!");
        // Plain chat answers carry no source on their stored row.
        assert_eq!(rows[1].source, None);
    }

    /// **Scenario**: dividing by zero narrates the failure; the error string
    /// is a tool result, not a fault, and the turn still counts as math.
    #[tokio::test]
    async fn divide_by_zero_is_narrated() {
        let (service, _) = service(
            MockLlm::fixed("mcp"),
            MockLlm::failing("chat model must not run"),
            MockLlm::scripted(vec![
                tool_call("divide", r#"{"a": 5, "b": 0}"#),
                LlmResponse {
                    content: "I cannot divide by zero.".to_string(),
                    ..LlmResponse::default()
                },
            ]),
        )
        .await;

        let response = service.ask("5 / 0?", None).await.unwrap();
        assert_eq!(response.answer, "I cannot divide by zero.");
    }

    /// **Scenario**: replaying the same query and history through a
    /// deterministic chat model yields the same answer both times.
    #[tokio::test]
    async fn chat_turn_is_idempotent() {
        let (service, _) = service(
            MockLlm::fixed("chat"),
            MockLlm::fixed("Deterministic answer."),
            MockLlm::failing("tool model must not run"),
        )
        .await;

        let first = service.ask("same question", None).await.unwrap();
        let second = service.ask("same question", None).await.unwrap();
        assert_eq!(first.answer, second.answer);
    }

    /// **Scenario**: a follow-up turn in the same session sees the earlier
    /// turn as history.
    #[tokio::test]
    async fn second_turn_carries_history() {
        let (service, store) = service(
            MockLlm::fixed("chat"),
            MockLlm::fixed("Answer."),
            MockLlm::failing("tool model must not run"),
        )
        .await;

        let first = service.ask("first question", None).await.unwrap();
        let history = store.load_history(&first.session_id, 20).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::Human);
        assert_eq!(history[0].content, "first question");

        let second = service
            .ask("second question", Some(&first.session_id))
            .await
            .unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(store.messages(&first.session_id).await.unwrap().len(), 4);
    }

    /// **Scenario**: an empty answer is not persisted and the session stays
    /// untitled.
    #[tokio::test]
    async fn empty_answer_is_not_persisted() {
        let (service, store) = service(
            MockLlm::fixed("chat"),
            MockLlm::fixed(""),
            MockLlm::failing("tool model must not run"),
        )
        .await;

        let response = service.ask("hi", None).await.unwrap();
        assert_eq!(response.answer, "");
        assert!(store.messages(&response.session_id).await.unwrap().is_empty());
    }

    /// **Scenario**: the background titler names the session after the first
    /// streamed turn.
    #[tokio::test]
    async fn finished_turn_triggers_titling() {
        let (service, store) = service(
            MockLlm::fixed("chat"),
            MockLlm::fixed("An answer."),
            MockLlm::failing("tool model must not run"),
        )
        .await;

        let response = service.ask("name me", None).await.unwrap();

        let mut name = None;
        for _ in 0..100 {
            name = store.get(&response.session_id).await.unwrap().unwrap().name;
            if name.is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(name.as_deref(), Some("Test title"));
    }

    /// **Scenario**: classification priority is joke > math > chat over the
    /// executed-name sets.
    #[test]
    fn classify_source_priority() {
        assert_eq!(classify_source(&[]), AnswerSource::Chat);
        assert_eq!(
            classify_source(&["multiply".to_string()]),
            AnswerSource::McpMath
        );
        assert_eq!(
            classify_source(&["get_random_joke".to_string()]),
            AnswerSource::McpJoke
        );
        assert_eq!(
            classify_source(&["sqrt".to_string(), "get_joke_by_category".to_string()]),
            AnswerSource::McpJoke
        );
        assert_eq!(
            classify_source(&["unknown_tool".to_string()]),
            AnswerSource::Chat
        );
    }
}
