// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `namespace` - namespace registry events
//! * `slots` - wait slot allocator events
//! * `spawn` - spawn protocol events
//! * `lifecycle` - worker lifecycle events

use tracing::Span;

pub mod lifecycle;
pub mod namespace;
pub mod slots;
pub mod spawn;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
