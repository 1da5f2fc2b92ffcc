// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error taxonomy for namespace setup and the thread-spawn protocol.
//!
//! * [`ConfigError`] - bad configuration, raised once at call time and never retried.
//! * [`ProtocolError`] - a bug in the coordination logic itself (sentinel misuse,
//!   waiting on an unreserved slot, destroying a namespace that is not registered).
//! * [`RuntimeError`] - failures reported by the wasmtime collaborator.
//!
//! Spawn failures are deliberately absent: they reach the guest as negative
//! return values from `thread-spawn`, not as Rust errors.

mod config;
mod protocol;

pub use crate::runtime::RuntimeError;
pub use config::ConfigError;
pub use protocol::ProtocolError;

use thiserror::Error;

/// Top-level error for the launcher and namespace handles.
#[derive(Error, Debug)]
pub enum ThreadsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// A worker thread went away before reporting back.
    #[error("worker '{worker}' stopped before reporting: {reason}")]
    WorkerLost { worker: String, reason: String },
}

/// Result alias used throughout the crate.
pub type ThreadsResult<T> = Result<T, ThreadsError>;
