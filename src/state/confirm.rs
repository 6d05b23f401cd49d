use crate::state::reconciler::ReconcileResult;
use crate::state::turn::TurnState;
use crate::types::ChatMessage;
use serde_json::{Map, Value};

/// The tool proposal currently awaiting the user's approval, keyed by the
/// frontier ordinal of the snapshot it appeared in. Ephemeral: never
/// persisted, never survives the frontier moving on.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConfirmation {
    pub ordinal: usize,
    pub tool: Option<String>,
    pub args: Option<Map<String, Value>>,
    pub confirmed: bool,
}

/// Gate between the confirmation UI and the transport. Only the frontier
/// message can hold a pending confirmation; stale and duplicate confirms
/// are stopped here and never reach the backend.
#[derive(Debug, Default)]
pub struct ConfirmationGate {
    pending: Option<PendingConfirmation>,
    confirm_in_flight: bool,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track the frontier across a reconciliation. Entering
    /// `AwaitingConfirmation` creates the pending entry; re-observing the
    /// same frontier preserves it (including its `confirmed` flag); any
    /// other frontier discards it regardless of status.
    pub fn observe(&mut self, result: &ReconcileResult, conversation: &[ChatMessage]) {
        if !result.changed {
            return;
        }

        if result.state != TurnState::AwaitingConfirmation {
            self.pending = None;
            self.confirm_in_flight = false;
            return;
        }

        let ordinal = conversation.len().saturating_sub(1);
        let payload = result
            .last_message
            .as_ref()
            .map(ChatMessage::agent_payload)
            .unwrap_or_default();

        let same_proposal = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.ordinal == ordinal && pending.tool == payload.tool);
        if same_proposal {
            return;
        }

        self.pending = Some(PendingConfirmation {
            ordinal,
            tool: payload.tool,
            args: payload.args,
            confirmed: false,
        });
        self.confirm_in_flight = false;
    }

    /// True iff the frontier proposal still needs the user's approval.
    pub fn should_prompt(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.confirmed)
    }

    /// Hand out a confirm ticket when one may be sent: a pending,
    /// unconfirmed proposal with no confirm already in flight.
    pub fn begin_confirm(&mut self) -> Option<usize> {
        if self.confirm_in_flight {
            return None;
        }
        let ordinal = self
            .pending
            .as_ref()
            .filter(|pending| !pending.confirmed)
            .map(|pending| pending.ordinal)?;
        self.confirm_in_flight = true;
        Some(ordinal)
    }

    /// Settle an in-flight confirm. Success marks the entry confirmed iff
    /// it still matches the ticket; failure leaves it retryable.
    pub fn complete_confirm(&mut self, ordinal: usize, success: bool) {
        self.confirm_in_flight = false;
        if !success {
            return;
        }
        if let Some(pending) = self.pending.as_mut() {
            if pending.ordinal == ordinal {
                pending.confirmed = true;
            }
        }
    }

    pub fn pending(&self) -> Option<&PendingConfirmation> {
        self.pending.as_ref()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
