//! Session state machine for one voice interaction
//!
//! The machine enforces the happy-path ordering
//! Idle → Listening → Processing → Executing → Feedback → Idle, with an
//! escape to Error from any state and a reset to Idle from any state.
//! Guarded transitions fail silently when the current state is not the
//! expected predecessor, which makes the machine idempotent against
//! duplicate or late callbacks racing the orchestrator. Timeouts are owned
//! by the orchestrator and the resolver router, never by the machine.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Lifecycle state of a voice interaction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No interaction in progress
    #[default]
    Idle,
    /// Capturing an utterance from the microphone
    Listening,
    /// Final transcript received, resolution pending
    Processing,
    /// Resolved action is being dispatched
    Executing,
    /// Terminal result is on screen, waiting for auto-dismiss
    Feedback,
    /// Something failed; waiting for auto-dismiss
    Error,
}

impl SessionState {
    /// Check if no interaction is in flight
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    /// Check if the session is in an active state (not idle)
    pub fn is_active(&self) -> bool {
        !self.is_idle()
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Listening => write!(f, "Listening"),
            SessionState::Processing => write!(f, "Processing"),
            SessionState::Executing => write!(f, "Executing"),
            SessionState::Feedback => write!(f, "Feedback"),
            SessionState::Error => write!(f, "Error"),
        }
    }
}

/// Observable cell holding the current [`SessionState`].
///
/// Single writer (the orchestrator), multiple readers (UI layer, tests).
/// Cloning the cell clones a handle to the same underlying state.
#[derive(Clone)]
pub struct SessionCell {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCell {
    /// Create a new cell in the `Idle` state
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Idle);
        Self { tx: Arc::new(tx) }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        *self.tx.borrow()
    }

    /// Subscribe for reactive observation of state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Idle → Listening. Returns false (and leaves state unchanged) if an
    /// interaction is already in flight.
    pub fn start_session(&self) -> bool {
        self.transition(SessionState::Idle, SessionState::Listening)
    }

    /// Listening → Processing
    pub fn transition_to_processing(&self) -> bool {
        self.transition(SessionState::Listening, SessionState::Processing)
    }

    /// Processing → Executing
    pub fn transition_to_executing(&self) -> bool {
        self.transition(SessionState::Processing, SessionState::Executing)
    }

    /// Executing → Feedback
    pub fn transition_to_feedback(&self) -> bool {
        self.transition(SessionState::Executing, SessionState::Feedback)
    }

    /// Any state → Error
    pub fn transition_to_error(&self) {
        self.tx.send_replace(SessionState::Error);
        debug!("session → Error");
    }

    /// Any state → Idle (auto-dismiss path)
    pub fn transition_to_idle(&self) {
        self.tx.send_replace(SessionState::Idle);
        debug!("session → Idle");
    }

    /// Any state → Idle (explicit cancellation)
    pub fn cancel_session(&self) {
        self.tx.send_replace(SessionState::Idle);
        debug!("session cancelled → Idle");
    }

    fn transition(&self, expected: SessionState, next: SessionState) -> bool {
        let moved = self.tx.send_if_modified(|state| {
            if *state == expected {
                *state = next;
                true
            } else {
                false
            }
        });
        if moved {
            debug!("session {expected} → {next}");
        } else {
            warn!(
                "invalid session transition: {} → {next} (expected {expected})",
                self.state()
            );
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_in(state: SessionState) -> SessionCell {
        let cell = SessionCell::new();
        match state {
            SessionState::Idle => {}
            SessionState::Listening => {
                cell.start_session();
            }
            SessionState::Processing => {
                cell.start_session();
                cell.transition_to_processing();
            }
            SessionState::Executing => {
                cell.start_session();
                cell.transition_to_processing();
                cell.transition_to_executing();
            }
            SessionState::Feedback => {
                cell.start_session();
                cell.transition_to_processing();
                cell.transition_to_executing();
                cell.transition_to_feedback();
            }
            SessionState::Error => {
                cell.transition_to_error();
            }
        }
        assert_eq!(cell.state(), state);
        cell
    }

    const ALL_STATES: [SessionState; 6] = [
        SessionState::Idle,
        SessionState::Listening,
        SessionState::Processing,
        SessionState::Executing,
        SessionState::Feedback,
        SessionState::Error,
    ];

    #[test]
    fn test_happy_path_ordering() {
        let cell = SessionCell::new();
        assert!(cell.start_session());
        assert!(cell.transition_to_processing());
        assert!(cell.transition_to_executing());
        assert!(cell.transition_to_feedback());
        cell.transition_to_idle();
        assert!(cell.state().is_idle());
    }

    #[test]
    fn test_guarded_transitions_require_exact_predecessor() {
        // Each guarded transition succeeds from exactly one state and
        // leaves every other state untouched.
        let guarded: [(fn(&SessionCell) -> bool, SessionState); 4] = [
            (SessionCell::start_session, SessionState::Idle),
            (SessionCell::transition_to_processing, SessionState::Listening),
            (SessionCell::transition_to_executing, SessionState::Processing),
            (SessionCell::transition_to_feedback, SessionState::Executing),
        ];

        for (transition, predecessor) in guarded {
            for state in ALL_STATES {
                let cell = cell_in(state);
                let moved = transition(&cell);
                if state == predecessor {
                    assert!(moved, "expected transition from {state} to succeed");
                } else {
                    assert!(!moved, "expected transition from {state} to be rejected");
                    assert_eq!(cell.state(), state, "state changed despite rejection");
                }
            }
        }
    }

    #[test]
    fn test_cancel_reaches_idle_from_every_state() {
        for state in ALL_STATES {
            let cell = cell_in(state);
            cell.cancel_session();
            assert!(cell.state().is_idle(), "cancel from {state} did not reach Idle");
        }
    }

    #[test]
    fn test_error_reachable_from_every_state() {
        for state in ALL_STATES {
            let cell = cell_in(state);
            cell.transition_to_error();
            assert_eq!(cell.state(), SessionState::Error);
        }
    }

    #[test]
    fn test_duplicate_start_is_rejected() {
        let cell = SessionCell::new();
        assert!(cell.start_session());
        assert!(!cell.start_session());
        assert_eq!(cell.state(), SessionState::Listening);
    }

    #[test]
    fn test_subscribers_observe_transitions() {
        let cell = SessionCell::new();
        let rx = cell.subscribe();
        cell.start_session();
        assert_eq!(*rx.borrow(), SessionState::Listening);

        let clone = cell.clone();
        clone.transition_to_processing();
        assert_eq!(cell.state(), SessionState::Processing);
    }
}
