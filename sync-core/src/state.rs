//! Dispatcher lifecycle state machine.
//!
//! This module provides a pure, side-effect-free state machine for a
//! notification-dispatch session. It takes lifecycle events as input and
//! produces a new state plus a list of actions to execute.
//!
//! The actual work (running the loop, tearing the driver down) is performed
//! by sync-manager, not by this module.

use std::fmt;

/// Why a session stopped (or is stopping).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was called.
    Requested,
    /// The loop hit an unrecoverable error.
    Fatal {
        /// Description of the error.
        error: String,
    },
    /// The session never started.
    StartupFailed {
        /// Description of the error.
        error: String,
    },
}

/// Dispatcher state - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchState {
    /// Created, notifications not yet registered.
    Idle,
    /// Registered and processing notifications.
    Running,
    /// Leaving the loop; teardown pending.
    Stopping {
        /// What triggered the stop.
        reason: StopReason,
    },
    /// Teardown complete. Final.
    Terminated {
        /// What triggered the stop.
        reason: StopReason,
    },
}

impl DispatchState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// Invalid transitions leave the state unchanged and produce no actions.
    pub fn on_event(self, event: LifecycleEvent) -> (Self, Vec<Action>) {
        match (self, event) {
            // From Idle
            (Self::Idle, LifecycleEvent::Registered) => (Self::Running, vec![Action::EnterRunLoop]),
            (Self::Idle, LifecycleEvent::StartFailed { error }) => (
                Self::Terminated {
                    reason: StopReason::StartupFailed { error },
                },
                vec![Action::UndoStartup],
            ),

            // From Running
            (Self::Running, LifecycleEvent::StopRequested) => (
                Self::Stopping {
                    reason: StopReason::Requested,
                },
                vec![Action::BeginTeardown],
            ),
            (Self::Running, LifecycleEvent::FatalError { error }) => (
                Self::Stopping {
                    reason: StopReason::Fatal { error },
                },
                vec![Action::BeginTeardown],
            ),

            // From Stopping
            (Self::Stopping { reason }, LifecycleEvent::TeardownCompleted) => (
                Self::Terminated { reason },
                vec![Action::ClearDirectory],
            ),

            // Stop before start, repeated stops, events after termination
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the loop is processing notifications.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Check if the session has fully ended.
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated { .. })
    }

    /// Short lowercase label for logs and health output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopping { .. } => "stopping",
            Self::Terminated { .. } => "terminated",
        }
    }
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Events that can occur in a session's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Driver configured, notifications registered and session opened.
    Registered,
    /// One of the startup steps failed.
    StartFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// Stop was signalled.
    StopRequested,
    /// Processing hit an unrecoverable error.
    FatalError {
        /// Error message describing the failure.
        error: String,
    },
    /// Every teardown step has run.
    TeardownCompleted,
}

/// Actions to be executed by the lifecycle controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start pulling notifications.
    EnterRunLoop,
    /// Release whatever startup steps already succeeded.
    UndoStartup,
    /// Close the session and release the driver.
    BeginTeardown,
    /// Discard the directory contents.
    ClearDirectory,
}
