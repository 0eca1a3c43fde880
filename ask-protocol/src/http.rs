//! Request and response bodies of the REST surface.
//!
//! Mirrors what the web client sends and receives: ask requests, the
//! non-streaming answer shape, and the session management bodies.

use serde::{Deserialize, Serialize};

/// Body of `POST /ask` and query parameters of `GET /ask/stream`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
    /// Omitted or null means "start a new session".
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Body of the non-streaming `POST /ask` response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub session_id: String,
    /// Name the session had when the turn ran; titling happens in the
    /// background, so a fresh session still reports null here.
    pub session_name: Option<String>,
}

/// One session in listings and lookups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionOut {
    pub id: String,
    pub name: Option<String>,
    pub created_at: String,
}

/// One persisted transcript row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageOut {
    pub id: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

/// Body of `PATCH /ask/sessions/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenameSessionRequest {
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a request without `session_id` deserializes to None, the
    /// shape the web client sends when starting a fresh conversation.
    #[test]
    fn ask_request_session_id_defaults_to_none() {
        let req: AskRequest = serde_json::from_str(r#"{"query": "hi"}"#).unwrap();
        assert_eq!(req.query, "hi");
        assert_eq!(req.session_id, None);
    }

    /// **Scenario**: an explicit session id survives the round trip.
    #[test]
    fn ask_request_keeps_session_id() {
        let req: AskRequest =
            serde_json::from_str(r#"{"query": "hi", "session_id": "s1"}"#).unwrap();
        assert_eq!(req.session_id.as_deref(), Some("s1"));
    }

    /// **Scenario**: the answer body serializes a null name for untitled
    /// sessions instead of dropping the field.
    #[test]
    fn ask_response_serializes_null_name() {
        let body = AskResponse {
            answer: "42".to_string(),
            session_id: "s1".to_string(),
            session_name: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value["session_name"].is_null());
        assert_eq!(value["answer"], "42");
    }
}
