// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod atomics;       // wait slots in shared memory
pub mod config;        // config files + validation
pub mod errors;        // error handling
pub mod lifecycle;     // coordinator and worker threads
pub mod namespace;     // namespace ids + registry
pub mod observability;
pub mod pool;          // launcher and namespace handles
pub mod protocol;      // messages, mailboxes, thread-spawn
pub mod runtime;       // wasmtime engine, modules, instances
pub mod traits;        // instance hooks

#[cfg(test)]
mod testing;
