//! Validation job lifecycle state machine
//!
//! Pure reducer over the sequence of server status labels. Transitions
//! are forward-only through the fixed phase order; unrecognized status
//! labels and backward jumps are no-ops; `Completed` and `Failed` are
//! terminal. Progress is clamped to [0,100] on every update and never
//! decreases while the job has not failed.

use hyva_common::events::ValidationPhase;

/// Current lifecycle snapshot of one validation session
#[derive(Debug, Clone)]
pub struct ProgressStateMachine {
    phase: ValidationPhase,
    progress: u8,
    message: Option<String>,
}

impl Default for ProgressStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStateMachine {
    pub fn new() -> Self {
        Self {
            phase: ValidationPhase::Idle,
            progress: 0,
            message: None,
        }
    }

    /// Fold one event's status/progress/message into the machine.
    ///
    /// Returns true if anything observable changed (phase, progress, or
    /// message), so callers can skip republishing redundant snapshots.
    pub fn apply(&mut self, status: &str, raw_progress: i64, message: Option<&str>) -> bool {
        if self.phase.is_terminal() {
            return false;
        }

        let mut changed = false;

        if let Some(next) = ValidationPhase::from_status(status) {
            // Forward-only: a label earlier in the lifecycle than the
            // current phase is ignored
            if next.rank() > self.phase.rank() {
                self.phase = next;
                changed = true;
            }
        }

        let clamped = raw_progress.clamp(0, 100) as u8;
        let next_progress = if self.phase == ValidationPhase::Failed {
            clamped
        } else {
            // Monotone non-decreasing while the job is alive
            self.progress.max(clamped)
        };
        if next_progress != self.progress {
            self.progress = next_progress;
            changed = true;
        }

        if let Some(text) = message {
            if self.message.as_deref() != Some(text) {
                self.message = Some(text.to_string());
                changed = true;
            }
        }

        changed
    }

    pub fn phase(&self) -> ValidationPhase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        let mut machine = ProgressStateMachine::new();
        assert_eq!(machine.phase(), ValidationPhase::Idle);

        assert!(machine.apply("initializing", 5, None));
        assert_eq!(machine.phase(), ValidationPhase::Initializing);

        assert!(machine.apply("loading_data", 20, None));
        assert!(machine.apply("configuring", 40, None));
        assert!(machine.apply("validating", 60, None));
        assert_eq!(machine.phase(), ValidationPhase::Validating);
        assert_eq!(machine.progress(), 60);
    }

    #[test]
    fn test_backward_transition_is_noop() {
        let mut machine = ProgressStateMachine::new();
        machine.apply("validating", 60, None);
        machine.apply("initializing", 60, None);
        assert_eq!(machine.phase(), ValidationPhase::Validating);
    }

    #[test]
    fn test_unknown_status_is_noop() {
        let mut machine = ProgressStateMachine::new();
        machine.apply("validating", 50, None);
        machine.apply("reticulating_splines", 55, None);
        assert_eq!(machine.phase(), ValidationPhase::Validating);
        // Progress still folds even when the label is unknown
        assert_eq!(machine.progress(), 55);
    }

    #[test]
    fn test_skipping_phases_is_allowed() {
        let mut machine = ProgressStateMachine::new();
        machine.apply("validating", 80, None);
        assert_eq!(machine.phase(), ValidationPhase::Validating);
        machine.apply("completed", 100, None);
        assert_eq!(machine.phase(), ValidationPhase::Completed);
    }

    #[test]
    fn test_terminal_phase_freezes_machine() {
        let mut machine = ProgressStateMachine::new();
        machine.apply("completed", 100, Some("done"));
        assert!(machine.is_terminal());

        assert!(!machine.apply("validating", 10, Some("late frame")));
        assert_eq!(machine.phase(), ValidationPhase::Completed);
        assert_eq!(machine.progress(), 100);
        assert_eq!(machine.message(), Some("done"));
    }

    #[test]
    fn test_progress_clamped_to_valid_range() {
        let mut machine = ProgressStateMachine::new();
        machine.apply("validating", 250, None);
        assert_eq!(machine.progress(), 100);

        let mut machine = ProgressStateMachine::new();
        machine.apply("validating", -5, None);
        assert_eq!(machine.progress(), 0);
    }

    #[test]
    fn test_progress_never_decreases_while_alive() {
        let mut machine = ProgressStateMachine::new();
        machine.apply("validating", 70, None);
        machine.apply("validating", 40, None);
        assert_eq!(machine.progress(), 70);
    }

    #[test]
    fn test_failed_event_keeps_reported_progress() {
        let mut machine = ProgressStateMachine::new();
        machine.apply("validating", 70, None);
        machine.apply("failed", 0, None);
        assert_eq!(machine.phase(), ValidationPhase::Failed);
        assert_eq!(machine.progress(), 0);
    }
}
