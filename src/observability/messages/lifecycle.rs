// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for worker and coordinator lifecycle events.

use crate::lifecycle::ExitStatus;
use crate::observability::messages::StructuredLog;
use crate::protocol::{Endpoint, Role};
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A worker instantiated its module and is about to run guest code.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct WorkerStarted<'a> {
    pub namespace: &'a str,
    pub worker: Endpoint,
    pub role: Role,
}

impl Display for WorkerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} of namespace {} started as {}",
            self.worker, self.namespace, self.role
        )
    }
}

impl StructuredLog for WorkerStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            namespace = self.namespace,
            worker = %self.worker,
            role = %self.role,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "worker",
            span_name = name,
            namespace = self.namespace,
            worker = %self.worker,
            role = %self.role,
        )
    }
}

/// A worker finished.
///
/// # Log Level
/// `info!` for clean exits, `warn!` otherwise
pub struct WorkerExited<'a> {
    pub namespace: &'a str,
    pub worker: Endpoint,
    pub status: &'a ExitStatus,
}

impl Display for WorkerExited<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} of namespace {} exited: {}",
            self.worker, self.namespace, self.status
        )
    }
}

impl StructuredLog for WorkerExited<'_> {
    fn log(&self) {
        if self.status.is_success() {
            tracing::info!(
                namespace = self.namespace,
                worker = %self.worker,
                status = %self.status,
                "{}", self
            );
        } else {
            tracing::warn!(
                namespace = self.namespace,
                worker = %self.worker,
                status = %self.status,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "worker_exited",
            span_name = name,
            namespace = self.namespace,
            worker = %self.worker,
            status = %self.status,
        )
    }
}

/// A worker was told to stop before it received its thread data.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct WorkerCancelled<'a> {
    pub namespace: &'a str,
    pub worker: Endpoint,
}

impl Display for WorkerCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} of namespace {} stopped before starting",
            self.worker, self.namespace
        )
    }
}

impl StructuredLog for WorkerCancelled<'_> {
    fn log(&self) {
        tracing::debug!(
            namespace = self.namespace,
            worker = %self.worker,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "worker_cancelled",
            span_name = name,
            namespace = self.namespace,
            worker = %self.worker,
        )
    }
}

/// A dispatch loop hit a protocol violation.
///
/// # Log Level
/// `error!` - Indicates a bug in the coordination logic
pub struct DispatchFailed<'a> {
    pub namespace: &'a str,
    pub role: Role,
    pub error: &'a dyn std::error::Error,
}

impl Display for DispatchFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} of namespace {} failed to dispatch: {}",
            self.role, self.namespace, self.error
        )
    }
}

impl StructuredLog for DispatchFailed<'_> {
    fn log(&self) {
        tracing::error!(
            namespace = self.namespace,
            role = %self.role,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "dispatch_failed",
            span_name = name,
            namespace = self.namespace,
            role = %self.role,
        )
    }
}

/// The coordinator left its dispatch loop.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct CoordinatorStopped<'a> {
    pub namespace: &'a str,
    pub notified: usize,
}

impl Display for CoordinatorStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Coordinator of namespace {} stopped, {} child worker(s) notified",
            self.namespace, self.notified
        )
    }
}

impl StructuredLog for CoordinatorStopped<'_> {
    fn log(&self) {
        tracing::debug!(
            namespace = self.namespace,
            notified = self.notified,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "coordinator_stopped",
            span_name = name,
            namespace = self.namespace,
            notified = self.notified,
        )
    }
}
