//! Session lifecycle state machine using rust-fsm.
//!
//! The machine tracks the transient phases of the session (authenticating,
//! refreshing, signing out) explicitly instead of deriving them from
//! storage checks.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │    SignedOut    │ (initial)
//! └────────┬────────┘
//!          │ StartLogin / SessionRestored
//!          ▼
//! ┌─────────────────┐  LoginSucceeded   ┌─────────────────┐
//! │ Authenticating  │ ────────────────► │  Authenticated  │
//! └────────┬────────┘                   └───────┬─────────┘
//!          │ LoginFailed                        │ StartRefresh / StartLogout / SessionInvalidated
//!          ▼                                    ▼
//!      SignedOut                    Refreshing / SigningOut / SignedOut
//!                                        │
//!                                        │ RefreshSucceeded / RefreshFailed
//!                                        ▼
//!                             Authenticated / SignedOut
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Define the FSM using rust-fsm's declarative macro
// This generates a module `session_machine` with:
// - session_machine::State (enum)
// - session_machine::Input (enum)
// - session_machine::StateMachine (type alias)
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(SignedOut)

    SignedOut => {
        StartLogin => Authenticating,
        SessionRestored => Authenticated
    },
    Authenticating => {
        LoginSucceeded => Authenticated,
        LoginFailed => SignedOut
    },
    Authenticated => {
        StartRefresh => Refreshing,
        StartLogout => SigningOut,
        SessionInvalidated => SignedOut
    },
    Refreshing => {
        RefreshSucceeded => Authenticated,
        RefreshFailed => SignedOut
    },
    SigningOut => {
        LogoutCompleted => SignedOut
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// User-friendly session phase for external consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No session.
    SignedOut,
    /// Login or signup call in flight.
    Authenticating,
    /// Valid session.
    Authenticated,
    /// Token refresh in flight.
    Refreshing,
    /// Logout teardown in progress.
    SigningOut,
}

impl SessionPhase {
    /// Returns true if the user has a usable session. A refresh in flight
    /// still counts: in-flight domain requests are parked, not failed.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionPhase::Authenticated | SessionPhase::Refreshing)
    }

    /// Returns true if the phase is a transient/in-progress phase.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionPhase::Authenticating | SessionPhase::Refreshing | SessionPhase::SigningOut
        )
    }
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::SignedOut => SessionPhase::SignedOut,
            SessionMachineState::Authenticating => SessionPhase::Authenticating,
            SessionMachineState::Authenticated => SessionPhase::Authenticated,
            SessionMachineState::Refreshing => SessionPhase::Refreshing,
            SessionMachineState::SigningOut => SessionPhase::SigningOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_signed_out() {
        let machine = SessionMachine::new();
        assert_eq!(*machine.state(), SessionMachineState::SignedOut);
    }

    #[test]
    fn test_login_flow() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::StartLogin).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticating);

        machine
            .consume(&SessionMachineInput::LoginSucceeded)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_login_failure_returns_to_signed_out() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionMachineInput::StartLogin).unwrap();
        machine.consume(&SessionMachineInput::LoginFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::SignedOut);
    }

    #[test]
    fn test_session_restored_from_storage() {
        let mut machine = SessionMachine::new();

        machine
            .consume(&SessionMachineInput::SessionRestored)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_refresh_flow() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::StartLogin).unwrap();
        machine
            .consume(&SessionMachineInput::LoginSucceeded)
            .unwrap();

        machine.consume(&SessionMachineInput::StartRefresh).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Refreshing);

        machine
            .consume(&SessionMachineInput::RefreshSucceeded)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_refresh_failure_signs_out() {
        let mut machine = SessionMachine::new();
        machine
            .consume(&SessionMachineInput::SessionRestored)
            .unwrap();
        machine.consume(&SessionMachineInput::StartRefresh).unwrap();

        machine
            .consume(&SessionMachineInput::RefreshFailed)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::SignedOut);
    }

    #[test]
    fn test_logout_flow() {
        let mut machine = SessionMachine::new();
        machine
            .consume(&SessionMachineInput::SessionRestored)
            .unwrap();

        machine.consume(&SessionMachineInput::StartLogout).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::SigningOut);

        machine
            .consume(&SessionMachineInput::LogoutCompleted)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::SignedOut);
    }

    #[test]
    fn test_forced_invalidation_from_authenticated() {
        let mut machine = SessionMachine::new();
        machine
            .consume(&SessionMachineInput::SessionRestored)
            .unwrap();

        machine
            .consume(&SessionMachineInput::SessionInvalidated)
            .unwrap();
        assert_eq!(*machine.state(), SessionMachineState::SignedOut);
    }

    #[test]
    fn test_invalid_transition_returns_error() {
        let mut machine = SessionMachine::new();

        // Can't logout without a session
        assert!(machine
            .consume(&SessionMachineInput::StartLogout)
            .is_err());

        // Can't claim a refresh succeeded without one in flight
        assert!(machine
            .consume(&SessionMachineInput::RefreshSucceeded)
            .is_err());
    }

    #[test]
    fn test_phase_conversion() {
        assert_eq!(
            SessionPhase::from(&SessionMachineState::SignedOut),
            SessionPhase::SignedOut
        );
        assert_eq!(
            SessionPhase::from(&SessionMachineState::Authenticating),
            SessionPhase::Authenticating
        );
        assert_eq!(
            SessionPhase::from(&SessionMachineState::Authenticated),
            SessionPhase::Authenticated
        );
        assert_eq!(
            SessionPhase::from(&SessionMachineState::Refreshing),
            SessionPhase::Refreshing
        );
        assert_eq!(
            SessionPhase::from(&SessionMachineState::SigningOut),
            SessionPhase::SigningOut
        );
    }

    #[test]
    fn test_phase_is_authenticated() {
        assert!(!SessionPhase::SignedOut.is_authenticated());
        assert!(!SessionPhase::Authenticating.is_authenticated());
        assert!(SessionPhase::Authenticated.is_authenticated());
        assert!(SessionPhase::Refreshing.is_authenticated());
        assert!(!SessionPhase::SigningOut.is_authenticated());
    }

    #[test]
    fn test_phase_is_transient() {
        assert!(!SessionPhase::SignedOut.is_transient());
        assert!(SessionPhase::Authenticating.is_transient());
        assert!(!SessionPhase::Authenticated.is_transient());
        assert!(SessionPhase::Refreshing.is_transient());
        assert!(SessionPhase::SigningOut.is_transient());
    }
}
