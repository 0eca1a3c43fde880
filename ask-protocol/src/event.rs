//! Stream events for a running ask query.
//!
//! One query produces an ordered event stream: `session` first, then zero or
//! more `token` events, a `source` classification once generation finished,
//! an `error` if something failed, and always a final `done`. Serialized with
//! a `type` tag so clients can dispatch without peeking at optional fields.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where the answer of a turn came from.
///
/// `Chat` means plain model generation; the `Mcp*` variants mean at least one
/// tool of that family ran during the turn. Joke tools win over math tools
/// when both ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Chat,
    McpMath,
    McpJoke,
}

impl AnswerSource {
    /// Wire name of the variant, identical to its serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Chat => "chat",
            AnswerSource::McpMath => "mcp_math",
            AnswerSource::McpJoke => "mcp_joke",
        }
    }
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event in the ask stream.
///
/// Serialized as `{"type": "<variant>", ...fields}`. The contract for a
/// single query is: `session`, then `token`*, then `source` (only when the
/// graph ran to completion), then `error` (only when something failed), then
/// `done` exactly once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AskEvent {
    /// Session metadata, sent before any model output.
    Session {
        session_id: String,
        session_name: Option<String>,
    },
    /// One incremental chunk of the answer text.
    Token { token: String },
    /// Classification of the finished answer.
    Source { source: AnswerSource },
    /// Terminal failure notice; `done` still follows.
    Error { error: String },
    /// End of stream.
    Done,
}

impl AskEvent {
    /// Serializes to a `serde_json::Value` (object with a `type` tag).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
