// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the wait slot allocator.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Every usable slot is reserved.
///
/// # Log Level
/// `error!` - the spawn that needed a slot fails
pub struct SlotsExhausted {
    pub capacity: u32,
}

impl Display for SlotsExhausted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Wait slots exhausted: all {} slots are reserved",
            self.capacity
        )
    }
}

impl StructuredLog for SlotsExhausted {
    fn log(&self) {
        tracing::error!(capacity = self.capacity, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("slots_exhausted", span_name = name, capacity = self.capacity)
    }
}

/// A waiter gave up on its slot before anyone signaled it.
///
/// # Log Level
/// `warn!` - the waiting spawn reports failure
///
/// # Example
/// ```
/// use std::time::Duration;
/// use wasi_worker_threads::observability::messages::slots::SlotWaitTimedOut;
///
/// let msg = SlotWaitTimedOut { index: 7, timeout: Duration::from_secs(1) };
/// assert_eq!(msg.to_string(), "Wait on slot 7 timed out after 1s");
/// ```
pub struct SlotWaitTimedOut {
    pub index: u32,
    pub timeout: Duration,
}

impl Display for SlotWaitTimedOut {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Wait on slot {} timed out after {:?}",
            self.index, self.timeout
        )
    }
}

impl StructuredLog for SlotWaitTimedOut {
    fn log(&self) {
        tracing::warn!(
            index = self.index,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "slot_wait_timed_out",
            span_name = name,
            index = self.index,
            timeout = ?self.timeout,
        )
    }
}

/// A signal arrived for a reservation that no longer exists.
///
/// # Log Level
/// `debug!` - expected after a timeout, nothing to act on
pub struct StaleSignalDiscarded {
    pub index: u32,
    pub value: i32,
}

impl Display for StaleSignalDiscarded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Discarded late signal {} for slot {}",
            self.value, self.index
        )
    }
}

impl StructuredLog for StaleSignalDiscarded {
    fn log(&self) {
        tracing::debug!(index = self.index, value = self.value, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stale_signal",
            span_name = name,
            index = self.index,
            value = self.value,
        )
    }
}
