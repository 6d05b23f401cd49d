mod confirm;
mod reconciler;
mod session;
mod turn;

pub use confirm::{ConfirmationGate, PendingConfirmation};
pub use reconciler::{ReconcileResult, Reconciler};
pub use session::{SessionController, SessionUpdate, UserAction};
pub use turn::{derive_turn_state, dialogue_ended, TurnState};
