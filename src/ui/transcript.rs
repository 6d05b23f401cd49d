use crate::state::PendingConfirmation;
use crate::types::{Actor, ChatMessage};
use serde_json::{Map, Value};

/// Seed prompts the backend injects to steer the agent are marked with
/// this prefix and never shown.
const HIDDEN_PREFIX: &str = "###";

/// Project the conversation into display lines. Unrecognized actors are
/// skipped, seed prompts are hidden, and only the frontier message may
/// carry a live tool-proposal block; earlier confirm-shaped messages
/// render as ordinary history.
pub fn transcript_lines(
    messages: &[ChatMessage],
    pending: Option<&PendingConfirmation>,
) -> Vec<String> {
    let mut lines = Vec::new();
    let frontier = messages.len().saturating_sub(1);

    for (ordinal, message) in messages.iter().enumerate() {
        match message.classify() {
            Actor::User => {
                let text = message.user_text().trim();
                if text.is_empty() || text.starts_with(HIDDEN_PREFIX) {
                    continue;
                }
                push_block(&mut lines, text, "> ");
            }
            Actor::Agent => {
                let payload = message.agent_payload();
                let mut text = payload.response.trim().to_string();
                if payload.requires_confirm() && text.is_empty() {
                    text = format!(
                        "Agent is ready to run \"{}\". Please confirm.",
                        payload.tool.as_deref().unwrap_or("a tool")
                    );
                }
                if text.starts_with(HIDDEN_PREFIX) {
                    continue;
                }
                if !text.is_empty() {
                    push_block(&mut lines, &text, "");
                }
                if payload.requires_confirm() && ordinal == frontier {
                    push_proposal(
                        &mut lines,
                        payload.tool.as_deref(),
                        payload.args.as_ref(),
                        pending,
                    );
                }
            }
            Actor::Other => {}
        }
    }

    lines
}

pub fn format_args_preview(args: &Map<String, Value>) -> String {
    serde_json::to_string_pretty(&Value::Object(args.clone()))
        .unwrap_or_else(|_| "{}".to_string())
}

fn push_block(lines: &mut Vec<String>, text: &str, prefix: &str) {
    for line in text.lines() {
        lines.push(format!("{prefix}{line}"));
    }
    lines.push(String::new());
}

fn push_proposal(
    lines: &mut Vec<String>,
    tool: Option<&str>,
    args: Option<&Map<String, Value>>,
    pending: Option<&PendingConfirmation>,
) {
    let tool = tool.unwrap_or("unknown");
    lines.push(format!("* Tool: {tool}"));
    if let Some(args) = args {
        for line in format_args_preview(args).lines() {
            lines.push(format!("    {line}"));
        }
    }

    let confirmed = pending.is_some_and(|entry| entry.confirmed);
    if confirmed {
        lines.push(format!("  └ Running {tool}..."));
    } else {
        lines.push("  └ awaiting your confirmation".to_string());
    }
    lines.push(String::new());
}
