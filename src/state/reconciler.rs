use crate::state::turn::{derive_turn_state, dialogue_ended, TurnState};
use crate::types::ChatMessage;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileResult {
    pub state: TurnState,
    /// False when the snapshot is structurally identical to the stored
    /// conversation; consumers use this to skip re-rendering.
    pub changed: bool,
    /// True for an ended dialogue and for the never-started conversation.
    pub ended: bool,
    pub last_message: Option<ChatMessage>,
}

/// Owns the authoritative conversation and its derived turn state. The
/// backend replaces the whole history on every poll, so `ingest` compares
/// snapshots structurally and replaces wholesale on any difference.
#[derive(Debug)]
pub struct Reconciler {
    conversation: Vec<ChatMessage>,
    state: TurnState,
    ended: bool,
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            conversation: Vec::new(),
            state: TurnState::AwaitingUserInput,
            ended: true,
        }
    }

    pub fn ingest(&mut self, snapshot: Vec<ChatMessage>) -> ReconcileResult {
        if snapshot == self.conversation {
            return self.result(false);
        }

        self.conversation = snapshot;
        self.state = derive_turn_state(&self.conversation);
        self.ended = dialogue_ended(&self.conversation);
        self.result(true)
    }

    /// Reset to the pristine empty state (start of a new chat). Returns the
    /// reconciliation result of the now-empty conversation, flagged as a
    /// change so consumers redraw.
    pub fn clear(&mut self) -> ReconcileResult {
        *self = Self::new();
        self.result(true)
    }

    pub fn conversation(&self) -> &[ChatMessage] {
        &self.conversation
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    fn result(&self, changed: bool) -> ReconcileResult {
        ReconcileResult {
            state: self.state,
            changed,
            ended: self.ended,
            last_message: self.conversation.last().cloned(),
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}
