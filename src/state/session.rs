use crate::api::{BackendClient, ClientError};
use crate::config::Config;
use crate::poll::SnapshotPoller;
use crate::state::confirm::{ConfirmationGate, PendingConfirmation};
use crate::state::reconciler::{ReconcileResult, Reconciler};
use crate::types::{Actor, ChatMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    SendPrompt,
    Confirm { ordinal: usize },
    StartNewChat,
}

/// Everything the front end needs to know, delivered over one channel so
/// the consumer stays a single-threaded select loop.
#[derive(Debug)]
pub enum SessionUpdate {
    Snapshot {
        result: ReconcileResult,
        /// Cloned conversation when `result.changed`, empty otherwise.
        messages: Vec<ChatMessage>,
    },
    PollFailed {
        error: ClientError,
    },
    ActionCompleted(UserAction),
    ActionFailed {
        action: UserAction,
        error: ClientError,
    },
}

/// The owned controller for one chat session: transport client, shared
/// reconciler, confirmation gate, busy flag, and poller lifecycle. User
/// actions run as short-lived spawned tasks that report back through the
/// update channel; `apply_update` is the single-threaded point where
/// their outcomes (and polled snapshots) are folded into local state.
pub struct SessionController {
    client: Arc<BackendClient>,
    reconciler: Arc<Mutex<Reconciler>>,
    gate: ConfirmationGate,
    poller: SnapshotPoller,
    update_tx: mpsc::UnboundedSender<SessionUpdate>,
    poll_interval: Duration,
    /// Soft mutual exclusion: set optimistically when an action is
    /// dispatched, cleared when a snapshot reflects it or it fails.
    busy: bool,
}

impl SessionController {
    pub fn new(config: &Config) -> (Self, mpsc::UnboundedReceiver<SessionUpdate>) {
        Self::with_client(BackendClient::new(config), config.poll_interval)
    }

    #[cfg(test)]
    pub fn new_mock(
        mock_backend: Arc<dyn crate::api::client::MockBackend>,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SessionUpdate>) {
        Self::with_client(BackendClient::new_mock(mock_backend), poll_interval)
    }

    fn with_client(
        client: BackendClient,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let controller = Self {
            client: Arc::new(client),
            reconciler: Arc::new(Mutex::new(Reconciler::new())),
            gate: ConfirmationGate::new(),
            poller: SnapshotPoller::new(),
            update_tx,
            poll_interval,
            busy: false,
        };
        (controller, update_rx)
    }

    pub fn start_polling(&mut self) {
        self.poller.start(
            self.poll_interval,
            Arc::clone(&self.client),
            Arc::clone(&self.reconciler),
            self.update_tx.clone(),
        );
    }

    pub fn stop_polling(&mut self) {
        self.poller.stop();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Dispatch a user prompt. Empty-after-trim input fails fast with
    /// `InvalidArgument`; no task is spawned and nothing reaches the wire.
    pub fn send_message(&mut self, text: &str) -> Result<(), ClientError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ClientError::InvalidArgument(
                "message must not be empty".to_string(),
            ));
        }

        self.busy = true;
        let client = Arc::clone(&self.client);
        let update_tx = self.update_tx.clone();
        let prompt = trimmed.to_string();
        tokio::spawn(async move {
            let update = match client.send_prompt(&prompt).await {
                Ok(()) => SessionUpdate::ActionCompleted(UserAction::SendPrompt),
                Err(error) => SessionUpdate::ActionFailed {
                    action: UserAction::SendPrompt,
                    error,
                },
            };
            let _ = update_tx.send(update);
        });
        Ok(())
    }

    /// Dispatch a confirm for the frontier proposal. Returns false when
    /// the gate refuses (nothing pending, already confirmed, or a confirm
    /// already in flight); stale and duplicate confirms end here.
    pub fn confirm(&mut self) -> bool {
        let Some(ordinal) = self.gate.begin_confirm() else {
            return false;
        };

        self.busy = true;
        let client = Arc::clone(&self.client);
        let update_tx = self.update_tx.clone();
        tokio::spawn(async move {
            let action = UserAction::Confirm { ordinal };
            let update = match client.confirm().await {
                Ok(()) => SessionUpdate::ActionCompleted(action),
                Err(error) => SessionUpdate::ActionFailed { action, error },
            };
            let _ = update_tx.send(update);
        });
        true
    }

    /// Ask the backend for a fresh workflow, then clear local state. The
    /// cleared (empty, ended) snapshot is pushed through the channel so the
    /// view resets on the same path every other change arrives on.
    pub fn start_new_chat(&mut self) {
        let client = Arc::clone(&self.client);
        let reconciler = Arc::clone(&self.reconciler);
        let update_tx = self.update_tx.clone();
        tokio::spawn(async move {
            match client.start_new_chat().await {
                Ok(()) => {
                    let result = reconciler.lock().await.clear();
                    let _ = update_tx.send(SessionUpdate::Snapshot {
                        result,
                        messages: Vec::new(),
                    });
                    let _ = update_tx.send(SessionUpdate::ActionCompleted(UserAction::StartNewChat));
                }
                Err(error) => {
                    let _ = update_tx.send(SessionUpdate::ActionFailed {
                        action: UserAction::StartNewChat,
                        error,
                    });
                }
            }
        });
    }

    /// Fold one update into controller state. Called from the consumer's
    /// select loop, so gate and busy flag see updates strictly in order.
    pub fn apply_update(&mut self, update: &SessionUpdate) {
        match update {
            SessionUpdate::Snapshot { result, messages } => {
                self.gate.observe(result, messages);
                if result.changed && !self.frontier_awaits_backend(messages) {
                    self.busy = false;
                }
            }
            // Poll failures self-heal on the next tick; nothing to fold.
            SessionUpdate::PollFailed { .. } => {}
            SessionUpdate::ActionCompleted(UserAction::SendPrompt) => {
                // Busy holds until a snapshot reflects the prompt.
            }
            SessionUpdate::ActionCompleted(UserAction::Confirm { ordinal }) => {
                self.gate.complete_confirm(*ordinal, true);
            }
            SessionUpdate::ActionCompleted(UserAction::StartNewChat) => {
                self.gate.reset();
                self.busy = false;
            }
            SessionUpdate::ActionFailed { action, .. } => {
                if let UserAction::Confirm { ordinal } = action {
                    self.gate.complete_confirm(*ordinal, false);
                }
                self.busy = false;
            }
        }
    }

    /// A changed snapshot whose frontier is still the user's own message
    /// means the backend has not answered yet; busy stays on.
    fn frontier_awaits_backend(&self, messages: &[ChatMessage]) -> bool {
        matches!(
            messages.last().map(ChatMessage::classify),
            Some(Actor::User)
        )
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn should_prompt_confirm(&self) -> bool {
        self.gate.should_prompt()
    }

    pub fn pending_confirmation(&self) -> Option<&PendingConfirmation> {
        self.gate.pending()
    }
}
