// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{ProtocolError, ThreadsError};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a worker.
///
/// `Created -> Instantiated -> Ready -> Running -> Exited`, and any live
/// state may jump straight to `Exited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    Created,
    Instantiated,
    Ready,
    Running,
    Exited,
}

impl WorkerState {
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Created, Instantiated)
                | (Instantiated, Ready)
                | (Ready, Running)
                | (Created | Instantiated | Ready | Running, Exited)
        )
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Created => "created",
            WorkerState::Instantiated => "instantiated",
            WorkerState::Ready => "ready",
            WorkerState::Running => "running",
            WorkerState::Exited => "exited",
        };
        f.write_str(name)
    }
}

/// State machine of one named worker.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    worker: String,
    state: WorkerState,
}

impl Lifecycle {
    pub fn new(worker: impl Into<String>) -> Self {
        Self {
            worker: worker.into(),
            state: WorkerState::Created,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn advance(&mut self, next: WorkerState) -> Result<(), ProtocolError> {
        if !self.state.can_transition_to(next) {
            return Err(ProtocolError::InvalidTransition {
                worker: self.worker.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

/// How a worker ended.
#[derive(Debug, Clone)]
pub enum ExitStatus {
    /// The entry function returned normally.
    Returned,
    /// The guest called `proc_exit`.
    Exited(i32),
    /// Guest code trapped.
    Trapped(String),
    /// Setup failed before guest code ran.
    Failed(Arc<ThreadsError>),
    /// The worker thread panicked.
    Panicked(String),
}

impl ExitStatus {
    pub fn failed(error: impl Into<ThreadsError>) -> Self {
        ExitStatus::Failed(Arc::new(error.into()))
    }

    /// `Returned` or `proc_exit(0)`.
    pub fn is_success(&self) -> bool {
        matches!(self, ExitStatus::Returned | ExitStatus::Exited(0))
    }

    /// Process-style exit code.
    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Returned => 0,
            ExitStatus::Exited(code) => *code,
            _ => 1,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Returned => f.write_str("returned"),
            ExitStatus::Exited(code) => write!(f, "exited with code {code}"),
            ExitStatus::Trapped(reason) => write!(f, "trapped: {reason}"),
            ExitStatus::Failed(error) => write!(f, "failed: {error}"),
            ExitStatus::Panicked(reason) => write!(f, "panicked: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkerState::*;

    #[test]
    fn test_happy_path() {
        let mut lifecycle = Lifecycle::new("thread-1");
        for next in [Instantiated, Ready, Running, Exited] {
            lifecycle.advance(next).unwrap();
        }
        assert_eq!(lifecycle.state(), Exited);
    }

    #[test]
    fn test_any_live_state_may_exit() {
        for state in [Created, Instantiated, Ready, Running] {
            assert!(state.can_transition_to(Exited), "{state} -> exited");
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let mut lifecycle = Lifecycle::new("thread-2");
        let err = lifecycle.advance(Running).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidTransition {
                worker: "thread-2".to_string(),
                from: Created,
                to: Running,
            }
        );
        assert_eq!(lifecycle.state(), Created);

        lifecycle.advance(Exited).unwrap();
        assert!(lifecycle.advance(Exited).is_err());
        assert!(lifecycle.advance(Instantiated).is_err());
    }

    #[test]
    fn test_exit_status_codes() {
        assert!(ExitStatus::Returned.is_success());
        assert!(ExitStatus::Exited(0).is_success());
        assert!(!ExitStatus::Exited(2).is_success());
        assert_eq!(ExitStatus::Exited(2).code(), 2);
        assert_eq!(ExitStatus::Trapped("unreachable".into()).code(), 1);
        assert_eq!(ExitStatus::Panicked("boom".into()).to_string(), "panicked: boom");
    }
}
