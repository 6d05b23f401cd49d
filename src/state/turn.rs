use crate::types::{Actor, ChatMessage, NextStep};

/// Whose move it is, derived from the message list alone. Recomputed from
/// scratch on every reconciliation; only the frontier message matters, so
/// derivation is O(1) per poll. There are no event-driven transitions and
/// therefore nothing that can drift from the server-held conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingUserInput,
    AwaitingAgentResponse,
    AwaitingConfirmation,
    Ended,
}

impl TurnState {
    pub fn label(&self) -> &'static str {
        match self {
            TurnState::AwaitingUserInput => "your turn",
            TurnState::AwaitingAgentResponse => "agent is thinking",
            TurnState::AwaitingConfirmation => "awaiting confirmation",
            TurnState::Ended => "conversation ended",
        }
    }
}

pub fn derive_turn_state(conversation: &[ChatMessage]) -> TurnState {
    let Some(frontier) = conversation.last() else {
        return TurnState::AwaitingUserInput;
    };

    match frontier.classify() {
        Actor::User => TurnState::AwaitingAgentResponse,
        Actor::Agent => match frontier.agent_payload().next {
            Some(NextStep::Done) => TurnState::Ended,
            Some(NextStep::Confirm) => TurnState::AwaitingConfirmation,
            _ => TurnState::AwaitingUserInput,
        },
        // Bookkeeping actors never gate input.
        Actor::Other => TurnState::AwaitingUserInput,
    }
}

/// A conversation that has never started also reads as ended, so the
/// front end defaults to offering "start new chat".
pub fn dialogue_ended(conversation: &[ChatMessage]) -> bool {
    conversation.is_empty() || derive_turn_state(conversation) == TurnState::Ended
}
