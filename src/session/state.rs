//! Lifecycle state shared by the long-lived process owners.

use serde::Serialize;

/// Lifecycle state of a supervised long-lived process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No process is tracked.
    #[default]
    Idle,
    /// A process is tracked.
    Running,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Idle -> Running
    /// - Running -> Idle
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!((*self, target), (Idle, Running) | (Running, Idle))
    }

    /// Move to `target`, returning whether the state changed.
    pub fn transition_to(&mut self, target: SessionState) -> bool {
        if self.can_transition_to(target) {
            *self = target;
            true
        } else {
            false
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }
}
