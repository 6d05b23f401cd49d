use crate::api::logging::emit_poll_failure;
use crate::api::BackendClient;
use crate::state::{Reconciler, SessionUpdate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Fixed-interval scheduler over `fetch_history` + `Reconciler::ingest`.
/// Holds no conversational state of its own.
///
/// At most one fetch is in flight at a time: the task awaits the current
/// fetch before asking the ticker again, and `MissedTickBehavior::Skip`
/// discards ticks that elapsed meanwhile instead of queueing a backlog.
#[derive(Debug, Default)]
pub struct SnapshotPoller {
    handle: Option<JoinHandle<()>>,
}

impl SnapshotPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(
        &mut self,
        interval: Duration,
        client: Arc<BackendClient>,
        reconciler: Arc<Mutex<Reconciler>>,
        update_tx: mpsc::UnboundedSender<SessionUpdate>,
    ) {
        if self.is_running() {
            return;
        }

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                let update = match client.fetch_history().await {
                    Ok(snapshot) => {
                        let mut reconciler = reconciler.lock().await;
                        let result = reconciler.ingest(snapshot);
                        // The full conversation travels only when it
                        // actually changed; unchanged polls stay cheap.
                        let messages = if result.changed {
                            reconciler.conversation().to_vec()
                        } else {
                            Vec::new()
                        };
                        SessionUpdate::Snapshot { result, messages }
                    }
                    Err(error) => {
                        // Transient failures are expected; log, report,
                        // and keep the timer running.
                        emit_poll_failure(&error);
                        SessionUpdate::PollFailed { error }
                    }
                };

                if update_tx.send(update).is_err() {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SnapshotPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::MockBackend;
    use crate::api::mock_client::MockBackendScript;
    use crate::api::ClientError;
    use crate::state::TurnState;
    use crate::types::ChatMessage;
    use serde_json::json;

    #[tokio::test]
    async fn test_poller_forwards_snapshots_and_survives_failures() {
        let script = Arc::new(MockBackendScript::with_histories(vec![
            Ok(vec![ChatMessage::user("Book me a train")]),
            Err(ClientError::Api {
                status: 404,
                message: "workflow worker unavailable".to_string(),
            }),
            Ok(vec![
                ChatMessage::user("Book me a train"),
                ChatMessage::agent(json!({"response": "Booked!", "next": "done"})),
            ]),
        ]));
        let client = Arc::new(BackendClient::new_mock(
            Arc::clone(&script) as Arc<dyn MockBackend>
        ));
        let reconciler = Arc::new(Mutex::new(Reconciler::new()));
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();

        let mut poller = SnapshotPoller::new();
        poller.start(
            Duration::from_millis(5),
            client,
            Arc::clone(&reconciler),
            update_tx,
        );
        assert!(poller.is_running());

        match update_rx.recv().await.expect("first update") {
            SessionUpdate::Snapshot { result, messages } => {
                assert!(result.changed);
                assert_eq!(result.state, TurnState::AwaitingAgentResponse);
                assert_eq!(messages.len(), 1);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }

        // A failed poll is reported but does not stop the timer.
        match update_rx.recv().await.expect("second update") {
            SessionUpdate::PollFailed { error } => assert_eq!(error.status(), 404),
            other => panic!("expected poll failure, got {other:?}"),
        }

        match update_rx.recv().await.expect("third update") {
            SessionUpdate::Snapshot { result, .. } => {
                assert!(result.changed);
                assert_eq!(result.state, TurnState::Ended);
                assert!(result.ended);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }

        poller.stop();
        assert!(!poller.is_running());
    }

    #[tokio::test]
    async fn test_unchanged_snapshot_reports_no_change() {
        let snapshot = vec![ChatMessage::user("hello")];
        let script = Arc::new(MockBackendScript::with_histories(vec![
            Ok(snapshot.clone()),
            Ok(snapshot),
        ]));
        let client = Arc::new(BackendClient::new_mock(
            Arc::clone(&script) as Arc<dyn MockBackend>
        ));
        let reconciler = Arc::new(Mutex::new(Reconciler::new()));
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();

        let mut poller = SnapshotPoller::new();
        poller.start(
            Duration::from_millis(5),
            client,
            reconciler,
            update_tx,
        );

        let first = update_rx.recv().await.expect("first update");
        let second = update_rx.recv().await.expect("second update");
        match (first, second) {
            (
                SessionUpdate::Snapshot { result: first, .. },
                SessionUpdate::Snapshot {
                    result: second,
                    messages,
                },
            ) => {
                assert!(first.changed);
                assert!(!second.changed);
                assert_eq!(second.state, first.state);
                assert!(messages.is_empty());
            }
            other => panic!("expected two snapshots, got {other:?}"),
        }

        poller.stop();
    }

    #[tokio::test]
    async fn test_start_is_idempotent_while_running() {
        let script = Arc::new(MockBackendScript::with_histories(vec![Ok(Vec::new())]));
        let client = Arc::new(BackendClient::new_mock(
            Arc::clone(&script) as Arc<dyn MockBackend>
        ));
        let reconciler = Arc::new(Mutex::new(Reconciler::new()));
        let (update_tx, _update_rx) = mpsc::unbounded_channel();

        let mut poller = SnapshotPoller::new();
        poller.start(
            Duration::from_millis(5),
            Arc::clone(&client),
            Arc::clone(&reconciler),
            update_tx.clone(),
        );
        let running = poller.is_running();
        poller.start(Duration::from_millis(5), client, reconciler, update_tx);
        assert_eq!(poller.is_running(), running);

        poller.stop();
    }
}
