// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for `thread-spawn` requests.

use crate::observability::messages::StructuredLog;
use crate::protocol::Endpoint;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A guest called `thread-spawn`.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct SpawnRequested<'a> {
    pub namespace: &'a str,
    pub from: Endpoint,
    pub start_arg: i32,
}

impl Display for SpawnRequested<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} requested a thread with start argument {:#x}",
            self.from, self.start_arg
        )
    }
}

impl StructuredLog for SpawnRequested<'_> {
    fn log(&self) {
        tracing::debug!(
            namespace = self.namespace,
            from = %self.from,
            start_arg = self.start_arg,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "thread_spawn",
            span_name = name,
            namespace = self.namespace,
            from = %self.from,
            start_arg = self.start_arg,
        )
    }
}

/// A spawned thread is running and its id was handed back to the caller.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ThreadSpawned<'a> {
    pub namespace: &'a str,
    pub thread_id: i32,
    pub elapsed: Duration,
}

impl Display for ThreadSpawned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Thread {} of namespace {} started in {:?}",
            self.thread_id, self.namespace, self.elapsed
        )
    }
}

impl StructuredLog for ThreadSpawned<'_> {
    fn log(&self) {
        tracing::debug!(
            namespace = self.namespace,
            thread_id = self.thread_id,
            elapsed_us = self.elapsed.as_micros() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "thread_spawned",
            span_name = name,
            namespace = self.namespace,
            thread_id = self.thread_id,
        )
    }
}

/// The new thread did not become ready within the spawn timeout.
///
/// # Log Level
/// `warn!` - The guest receives a negative return value
pub struct SpawnTimedOut<'a> {
    pub namespace: &'a str,
    pub start_arg: i32,
    pub timeout: Duration,
}

impl Display for SpawnTimedOut<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Spawning thread with start argument {:#x} in namespace {} timed out after {:?}",
            self.start_arg, self.namespace, self.timeout
        )
    }
}

impl StructuredLog for SpawnTimedOut<'_> {
    fn log(&self) {
        tracing::warn!(
            namespace = self.namespace,
            start_arg = self.start_arg,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "spawn_timed_out",
            span_name = name,
            namespace = self.namespace,
            start_arg = self.start_arg,
        )
    }
}

/// A spawn request failed before a thread existed.
///
/// # Log Level
/// `error!` - The guest receives a negative return value
pub struct SpawnFailed<'a> {
    pub namespace: &'a str,
    pub start_arg: i32,
    pub code: i32,
    pub reason: &'a str,
}

impl Display for SpawnFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Spawning thread with start argument {:#x} in namespace {} failed ({}): {}",
            self.start_arg, self.namespace, self.code, self.reason
        )
    }
}

impl StructuredLog for SpawnFailed<'_> {
    fn log(&self) {
        tracing::error!(
            namespace = self.namespace,
            start_arg = self.start_arg,
            code = self.code,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "spawn_failed",
            span_name = name,
            namespace = self.namespace,
            start_arg = self.start_arg,
            code = self.code,
        )
    }
}
