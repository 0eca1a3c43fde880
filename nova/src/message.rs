//! Message types for conversation state.
//!
//! Roles: System (usually first in the list), User, Assistant, Tool. The
//! Assistant variant carries the tool calls it requested; Tool carries one
//! execution result and correlates back through `call_id`. Persisted history
//! rows use [`Role`] + text only, since tool traffic is never stored.

use serde::{Deserialize, Serialize};

/// A single tool invocation produced by the model.
///
/// `name` and `arguments` align with `tools/call`: arguments arrive as a JSON
/// string and are parsed at execution time. `id` correlates the eventual
/// result message with this request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name as registered in the tool source.
    pub name: String,
    /// Arguments as a JSON string; parsed when the tool is executed.
    pub arguments: String,
    /// Optional id to match with the tool result message.
    pub id: Option<String>,
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// System prompt; typically placed first in the message list.
    System(String),
    /// User input.
    User(String),
    /// Model reply, possibly requesting tool calls. A reply that only
    /// requests tools has empty `content`.
    Assistant {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    /// Result of one executed tool call, fed back to the model.
    Tool {
        call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::System(content.into())
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::User(content.into())
    }

    /// Creates a plain assistant message with no tool calls.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Creates an assistant message that requests tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    /// Creates a tool result message for the call with `call_id`.
    pub fn tool(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::Tool {
            call_id: call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Role of a persisted transcript row.
///
/// Only user and assistant turns are stored; the wire names match the rows
/// the web client renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

impl Role {
    /// Lowercase wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "assistant",
        }
    }

    /// Title-cased label for prompt rendering.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Human => "Human",
            Role::Assistant => "Assistant",
        }
    }

    /// Parses a storage name; anything unknown falls back to Assistant so a
    /// corrupted row degrades to context instead of an error.
    pub fn parse(s: &str) -> Self {
        match s {
            "human" => Role::Human,
            _ => Role::Assistant,
        }
    }
}

/// One prior turn loaded from the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Converts the row back into a conversation message.
    pub fn to_message(&self) -> Message {
        match self.role {
            Role::Human => Message::user(self.content.clone()),
            Role::Assistant => Message::assistant(self.content.clone()),
        }
    }
}
