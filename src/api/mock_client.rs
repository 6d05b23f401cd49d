use crate::api::client::MockBackend;
use crate::api::error::ClientError;
use crate::types::ChatMessage;
use std::sync::{Arc, Mutex};

/// Scripted backend for tests: history snapshots are consumed in order,
/// confirm outcomes likewise; prompts and new-chat calls are recorded so
/// tests can assert what reached the transport.
#[derive(Clone, Default)]
pub struct MockBackendScript {
    histories: Arc<Mutex<Vec<Result<Vec<ChatMessage>, ClientError>>>>,
    confirm_outcomes: Arc<Mutex<Vec<Result<(), ClientError>>>>,
    sent_prompts: Arc<Mutex<Vec<String>>>,
    new_chat_calls: Arc<Mutex<usize>>,
}

impl MockBackendScript {
    pub fn with_histories(histories: Vec<Result<Vec<ChatMessage>, ClientError>>) -> Self {
        Self {
            histories: Arc::new(Mutex::new(histories)),
            ..Self::default()
        }
    }

    pub fn push_confirm_outcome(&self, outcome: Result<(), ClientError>) {
        self.confirm_outcomes.lock().unwrap().push(outcome);
    }

    pub fn sent_prompts(&self) -> Vec<String> {
        self.sent_prompts.lock().unwrap().clone()
    }

    pub fn new_chat_calls(&self) -> usize {
        *self.new_chat_calls.lock().unwrap()
    }
}

impl MockBackend for MockBackendScript {
    fn fetch_history(&self) -> Result<Vec<ChatMessage>, ClientError> {
        let mut histories = self.histories.lock().unwrap();
        if histories.is_empty() {
            return Err(ClientError::Api {
                status: 500,
                message: "MockBackendScript: no more scripted snapshots".to_string(),
            });
        }
        histories.remove(0)
    }

    fn send_prompt(&self, prompt: &str) -> Result<(), ClientError> {
        self.sent_prompts.lock().unwrap().push(prompt.to_string());
        Ok(())
    }

    fn confirm(&self) -> Result<(), ClientError> {
        let mut outcomes = self.confirm_outcomes.lock().unwrap();
        if outcomes.is_empty() {
            return Ok(());
        }
        outcomes.remove(0)
    }

    fn start_new_chat(&self) -> Result<(), ClientError> {
        *self.new_chat_calls.lock().unwrap() += 1;
        Ok(())
    }
}
