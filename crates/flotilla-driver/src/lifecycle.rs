//! Driver lifecycle states and the transitions between them.
//!
//! ```text
//!             +------------+
//!             | NotStarted |
//!             +-----+------+
//!                   | start
//!          +--------+--------+
//!          v                 v
//!     +---------+       +---------+
//!     | Running |------>| Aborted |
//!     +----+----+ abort +----+----+
//!          | stop            | stop
//!          +--------+--------+
//!                   v
//!              +---------+
//!              | Stopped |
//!              +---------+
//! ```
//!
//! `Stopped` and `Aborted` are terminal for the event loop; `Aborted`
//! still admits a final `stop` so resources can be released.

use std::fmt;

/// Lifecycle state of a [`SchedulerDriver`](crate::SchedulerDriver).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Constructed but not yet started.
    NotStarted,
    /// Listener up and registration sent; events flow.
    Running,
    /// Shut down deliberately.
    Stopped,
    /// Torn down after an unrecoverable error.
    Aborted,
}

impl DriverState {
    /// Whether the driver has finished running.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Aborted)
    }

    /// Whether `stop` does anything from this state.
    #[must_use]
    pub const fn can_stop(self) -> bool {
        matches!(self, Self::Running | Self::Aborted)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not-started",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Check if a driver state transition is allowed.
#[must_use]
pub const fn is_valid_transition(from: DriverState, to: DriverState) -> bool {
    use DriverState::{Aborted, NotStarted, Running, Stopped};
    matches!(
        (from, to),
        (NotStarted, Running | Aborted) | (Running, Stopped | Aborted) | (Aborted, Stopped)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!DriverState::NotStarted.is_terminal());
        assert!(!DriverState::Running.is_terminal());
        assert!(DriverState::Stopped.is_terminal());
        assert!(DriverState::Aborted.is_terminal());
    }

    #[test]
    fn stoppable_states() {
        assert!(DriverState::Running.can_stop());
        assert!(DriverState::Aborted.can_stop());
        assert!(!DriverState::NotStarted.can_stop());
        assert!(!DriverState::Stopped.can_stop());
    }

    #[test]
    fn valid_transitions() {
        assert!(is_valid_transition(
            DriverState::NotStarted,
            DriverState::Running
        ));
        assert!(is_valid_transition(
            DriverState::NotStarted,
            DriverState::Aborted
        ));
        assert!(is_valid_transition(
            DriverState::Running,
            DriverState::Stopped
        ));
        assert!(is_valid_transition(
            DriverState::Running,
            DriverState::Aborted
        ));
        assert!(is_valid_transition(
            DriverState::Aborted,
            DriverState::Stopped
        ));
    }

    #[test]
    fn invalid_transitions() {
        assert!(!is_valid_transition(
            DriverState::NotStarted,
            DriverState::Stopped
        ));
        assert!(!is_valid_transition(
            DriverState::Stopped,
            DriverState::Running
        ));
        assert!(!is_valid_transition(
            DriverState::Aborted,
            DriverState::Running
        ));
        assert!(!is_valid_transition(
            DriverState::Stopped,
            DriverState::Aborted
        ));
    }

    #[test]
    fn display_names() {
        assert_eq!(DriverState::NotStarted.to_string(), "not-started");
        assert_eq!(DriverState::Running.to_string(), "running");
        assert_eq!(DriverState::Stopped.to_string(), "stopped");
        assert_eq!(DriverState::Aborted.to_string(), "aborted");
    }
}
