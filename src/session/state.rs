//! Session lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a managed session, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// The service is still provisioning the session.
    #[default]
    Creating,
    /// The session is serving and can accept connections.
    Active,
    /// Termination has been requested and is in progress.
    Terminating,
    /// The session has been terminated.
    Terminated,
    /// The session failed and cannot be used.
    Failed,
    /// State not recognized by this client version.
    #[serde(other)]
    Unspecified,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Creating -> Active
    /// - Creating -> Failed
    /// - Active -> Terminating
    /// - Active -> Failed
    /// - Terminating -> Terminated
    /// - Terminating -> Failed
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Creating, Active)
                | (Creating, Failed)
                | (Active, Terminating)
                | (Active, Failed)
                | (Terminating, Terminated)
                | (Terminating, Failed)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: SessionState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::SparkConnectError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated | SessionState::Failed)
    }

    /// Check if an existing session in this state can still be reused by
    /// a reconnecting driver.
    pub fn is_usable(&self) -> bool {
        matches!(self, SessionState::Creating | SessionState::Active)
    }

    /// Check if termination has at least started.
    pub fn is_terminating_or_done(&self) -> bool {
        matches!(
            self,
            SessionState::Terminating | SessionState::Terminated | SessionState::Failed
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Creating => "CREATING",
            SessionState::Active => "ACTIVE",
            SessionState::Terminating => "TERMINATING",
            SessionState::Terminated => "TERMINATED",
            SessionState::Failed => "FAILED",
            SessionState::Unspecified => "STATE_UNSPECIFIED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let mut state = SessionState::Creating;
        assert!(state.transition_to(SessionState::Active).is_ok());
        assert_eq!(state, SessionState::Active);

        assert!(state.transition_to(SessionState::Terminating).is_ok());
        assert_eq!(state, SessionState::Terminating);

        assert!(state.transition_to(SessionState::Terminated).is_ok());
        assert_eq!(state, SessionState::Terminated);
    }

    #[test]
    fn test_creation_can_fail() {
        let mut state = SessionState::Creating;
        assert!(state.transition_to(SessionState::Failed).is_ok());
        assert!(state.is_terminal());
    }

    #[test]
    fn test_invalid_creating_to_terminated() {
        let mut state = SessionState::Creating;
        assert!(state.transition_to(SessionState::Terminated).is_err());
        // State should remain unchanged
        assert_eq!(state, SessionState::Creating);
    }

    #[test]
    fn test_no_transitions_from_terminal() {
        for terminal in [SessionState::Terminated, SessionState::Failed] {
            let mut state = terminal;
            assert!(state.transition_to(SessionState::Active).is_err());
            assert!(state.transition_to(SessionState::Creating).is_err());
        }
    }

    #[test]
    fn test_is_usable() {
        assert!(SessionState::Creating.is_usable());
        assert!(SessionState::Active.is_usable());
        assert!(!SessionState::Terminating.is_usable());
        assert!(!SessionState::Terminated.is_usable());
        assert!(!SessionState::Failed.is_usable());
    }

    #[test]
    fn test_wire_format() {
        let state: SessionState = serde_json::from_str("\"ACTIVE\"").unwrap();
        assert_eq!(state, SessionState::Active);

        let json = serde_json::to_string(&SessionState::Terminating).unwrap();
        assert_eq!(json, "\"TERMINATING\"");
    }

    #[test]
    fn test_unknown_state_deserializes_as_unspecified() {
        let state: SessionState = serde_json::from_str("\"SOME_FUTURE_STATE\"").unwrap();
        assert_eq!(state, SessionState::Unspecified);
        assert!(!state.is_usable());
    }
}
