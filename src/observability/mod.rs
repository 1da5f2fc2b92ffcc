// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the thread runtime.
//!
//! Every diagnostic is a small message struct with a `Display` implementation
//! and a [`StructuredLog`](messages::StructuredLog) implementation that emits
//! it at the right level with its fields attached. Call sites never format
//! log strings themselves.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::namespace` - namespace creation, lookup and teardown
//! * `messages::slots` - wait slot exhaustion, timeouts and stale signals
//! * `messages::spawn` - `thread-spawn` requests and their results
//! * `messages::lifecycle` - worker start, exit and protocol anomalies
//!
//! # Usage
//!
//! ```rust
//! use wasi_worker_threads::observability::messages::slots::SlotsExhausted;
//! use wasi_worker_threads::observability::messages::StructuredLog;
//!
//! SlotsExhausted { capacity: 16_383 }.log();
//! ```

pub mod messages;
