//! Internal run events and the context nodes emit them through.
//!
//! [`StreamEvent`] is the closed set of things a running graph can report:
//! node boundaries, answer tokens, and tool activity. Consumers match
//! exhaustively, so adding a variant is a deliberate API change rather than
//! a stringly-typed drive-by. [`RunContext`] carries the optional event
//! sender into nodes; without one, emits are no-ops and nodes take their
//! non-streaming paths.

use tokio::sync::mpsc;

/// One observable step of a graph run.
///
/// `Token` events carry the id of the node that produced them so consumers
/// can forward answer text while ignoring internal generations.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// A node is about to run.
    NodeStart { node: String },
    /// A node finished successfully.
    NodeEnd { node: String },
    /// One incremental chunk of model output.
    Token { node: String, content: String },
    /// A tool call is being dispatched.
    ToolStart { name: String },
    /// A tool call finished; `is_error` marks results rendered from failures.
    ToolEnd { name: String, is_error: bool },
}

/// Run context passed into nodes.
///
/// Holds the optional event sender for streaming runs. A dropped receiver
/// does not fail the run; events are simply discarded.
#[derive(Clone, Default)]
pub struct RunContext {
    events: Option<mpsc::Sender<StreamEvent>>,
}

impl RunContext {
    /// Context for a non-streaming run; `emit` is a no-op.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that forwards events into `tx`.
    pub fn with_events(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self { events: Some(tx) }
    }

    /// Whether this run has an event consumer attached.
    pub fn streaming(&self) -> bool {
        self.events.is_some()
    }

    /// Emits an event; silently dropped when not streaming or when the
    /// receiver went away.
    pub async fn emit(&self, event: StreamEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
