//! Full turn cycle through the public reconciler and gate: user prompt,
//! agent tool proposal, confirmation, tool run, dialogue end.

use attache::state::{ConfirmationGate, Reconciler, TurnState};
use attache::types::ChatMessage;
use serde_json::json;

fn ingest_and_observe(
    reconciler: &mut Reconciler,
    gate: &mut ConfirmationGate,
    snapshot: Vec<ChatMessage>,
) -> TurnState {
    let result = reconciler.ingest(snapshot);
    gate.observe(&result, reconciler.conversation());
    result.state
}

#[test]
fn test_booking_flow_from_prompt_to_done() {
    let mut reconciler = Reconciler::new();
    let mut gate = ConfirmationGate::new();

    // The user speaks; the agent owes a response.
    let user_turn = ChatMessage::user("Book me a train");
    let state = ingest_and_observe(&mut reconciler, &mut gate, vec![user_turn.clone()]);
    assert_eq!(state, TurnState::AwaitingAgentResponse);
    assert!(!gate.should_prompt());

    // The agent proposes a tool run and asks for confirmation.
    let proposal = ChatMessage::agent(json!({
        "response": "Shall I book?",
        "next": "confirm",
        "tool": "book_train",
        "args": {"id": "T1"}
    }));
    let state = ingest_and_observe(
        &mut reconciler,
        &mut gate,
        vec![user_turn.clone(), proposal.clone()],
    );
    assert_eq!(state, TurnState::AwaitingConfirmation);
    assert!(gate.should_prompt());

    // The identical snapshot arrives on the next poll: nothing changes.
    let repeat = reconciler.ingest(vec![user_turn.clone(), proposal.clone()]);
    assert!(!repeat.changed);
    gate.observe(&repeat, reconciler.conversation());
    assert!(gate.should_prompt());

    // The user approves and the transport confirm resolves.
    let ticket = gate.begin_confirm().expect("confirm must be allowed");
    gate.complete_confirm(ticket, true);
    assert!(!gate.should_prompt());
    assert!(gate.pending().expect("entry kept for display").confirmed);

    // The tool ran; the agent wraps up. The gate goes quiet for every
    // prior message.
    let state = ingest_and_observe(
        &mut reconciler,
        &mut gate,
        vec![
            user_turn,
            proposal,
            ChatMessage::agent(json!({"response": "Booked!", "next": "done"})),
        ],
    );
    assert_eq!(state, TurnState::Ended);
    assert!(!gate.should_prompt());
    assert!(gate.pending().is_none());
}

#[test]
fn test_superseded_proposal_never_prompts_again() {
    let mut reconciler = Reconciler::new();
    let mut gate = ConfirmationGate::new();

    let proposal = ChatMessage::agent(json!({
        "response": "Run it?",
        "next": "confirm",
        "tool": "create_invoice"
    }));
    let state = ingest_and_observe(&mut reconciler, &mut gate, vec![proposal.clone()]);
    assert_eq!(state, TurnState::AwaitingConfirmation);

    // Any further message supersedes the proposal, including a plain
    // question.
    let state = ingest_and_observe(
        &mut reconciler,
        &mut gate,
        vec![
            proposal,
            ChatMessage::agent(json!({"response": "One more detail first?", "next": "question"})),
        ],
    );
    assert_eq!(state, TurnState::AwaitingUserInput);
    assert!(!gate.should_prompt());
    assert_eq!(gate.begin_confirm(), None);
}
