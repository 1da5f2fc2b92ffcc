// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Host-facing entry point: launch a threaded module as a namespace and
//! control it through a [`NamespaceHandle`].

mod handle;
mod launcher;

pub use handle::NamespaceHandle;
pub use launcher::{LaunchOptions, ThreadPool};

use crate::errors::ProtocolError;
use crate::namespace::{CoordinationRecord, NamespaceRegistry};
use crate::observability::messages::namespace::NamespaceDestroyed;
use crate::observability::messages::StructuredLog;
use std::sync::Arc;

/// Unregister `namespace` and tell its coordinator and main worker to stop.
fn destroy_namespace(registry: &NamespaceRegistry, namespace: &str) -> Result<usize, ProtocolError> {
    registry.destroy(namespace).map(|record| teardown(&record))
}

/// Same as [`destroy_namespace`], for the holder of a specific record.
fn destroy_record(
    registry: &NamespaceRegistry,
    record: &Arc<CoordinationRecord>,
) -> Result<usize, ProtocolError> {
    registry.destroy_record(record).map(|record| teardown(&record))
}

fn teardown(record: &CoordinationRecord) -> usize {
    let notified = record.teardown();
    NamespaceDestroyed {
        namespace: record.namespace().as_str(),
        notified,
    }
    .log();
    notified
}
