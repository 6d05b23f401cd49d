use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::logging::emit_malformed_payload;

/// Envelope returned by `GET /get-conversation-history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistorySnapshot {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// One conversational turn as received on the wire. The backend replaces
/// the whole list on every poll; there is no incremental delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub actor: String,
    #[serde(default)]
    pub response: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    User,
    Agent,
    /// Backend bookkeeping actors (e.g. "user_confirmed_tool_run").
    /// Ignored by the view layer and never allowed to gate input.
    Other,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            actor: "user".to_string(),
            response: Value::String(text.into()),
        }
    }

    pub fn agent(payload: Value) -> Self {
        Self {
            actor: "agent".to_string(),
            response: payload,
        }
    }

    pub fn classify(&self) -> Actor {
        match self.actor.as_str() {
            "user" => Actor::User,
            "agent" => Actor::Agent,
            _ => Actor::Other,
        }
    }

    /// Display text of a user turn; user payloads are plain strings.
    pub fn user_text(&self) -> &str {
        self.response.as_str().unwrap_or_default()
    }

    pub fn agent_payload(&self) -> AgentPayload {
        AgentPayload::parse(&self.response)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    Question,
    Confirm,
    Done,
    Other(String),
}

impl NextStep {
    fn from_hint(hint: &str) -> Self {
        match hint {
            "question" => NextStep::Question,
            "confirm" => NextStep::Confirm,
            "done" => NextStep::Done,
            other => NextStep::Other(other.to_string()),
        }
    }
}

/// Parsed form of an agent turn's `response` value.
///
/// Agent payloads arrive either as a JSON object or as a string holding
/// serialized JSON, depending on the backend revision. Parsing is total:
/// anything that does not match degrades to the empty payload and is
/// reported through the diagnostics log, never to the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentPayload {
    pub response: String,
    pub next: Option<NextStep>,
    pub tool: Option<String>,
    pub args: Option<Map<String, Value>>,
}

impl AgentPayload {
    pub fn parse(raw: &Value) -> Self {
        match raw {
            Value::Object(fields) => Self::from_fields(fields),
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(fields)) => Self::from_fields(&fields),
                Ok(_) => {
                    emit_malformed_payload(text, "agent payload is not a JSON object");
                    Self::default()
                }
                Err(parse_error) => {
                    emit_malformed_payload(text, &parse_error.to_string());
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let response = match fields.get("response") {
            Some(Value::String(text)) => text.clone(),
            // Unwrap exactly one nesting level; deeper nesting stays as-is.
            Some(Value::Object(inner)) => inner
                .get("response")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };

        Self {
            response,
            next: fields
                .get("next")
                .and_then(Value::as_str)
                .map(NextStep::from_hint),
            tool: fields
                .get("tool")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            args: fields.get("args").and_then(Value::as_object).cloned(),
        }
    }

    pub fn requires_confirm(&self) -> bool {
        self.next == Some(NextStep::Confirm)
    }

    pub fn is_done(&self) -> bool {
        self.next == Some(NextStep::Done)
    }
}
