// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Namespaces group one module instantiation with all of its threads.

mod id;
mod record;
mod registry;

pub use id::NamespaceId;
pub use record::{CoordinationRecord, SharedResources, WorkerSettings};
pub use registry::NamespaceRegistry;
