// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for namespace registration and teardown.

use crate::observability::messages::StructuredLog;
use crate::protocol::Endpoint;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A namespace finished setup and its main instance is live.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use wasi_worker_threads::observability::messages::namespace::NamespaceCreated;
///
/// let msg = NamespaceCreated {
///     namespace: "wasm_k3j9",
///     wait_slots: 16_384,
///     memory_pages: 17,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct NamespaceCreated<'a> {
    pub namespace: &'a str,
    pub wait_slots: u32,
    pub memory_pages: u64,
}

impl Display for NamespaceCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Namespace {} ready: {} wait slots, {} shared memory pages",
            self.namespace, self.wait_slots, self.memory_pages
        )
    }
}

impl StructuredLog for NamespaceCreated<'_> {
    fn log(&self) {
        tracing::info!(
            namespace = self.namespace,
            wait_slots = self.wait_slots,
            memory_pages = self.memory_pages,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "namespace",
            span_name = name,
            namespace = self.namespace,
            wait_slots = self.wait_slots,
            memory_pages = self.memory_pages,
        )
    }
}

/// Namespace setup failed and its registration was rolled back.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct NamespaceSetupFailed<'a> {
    pub namespace: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for NamespaceSetupFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Setup of namespace {} failed: {}",
            self.namespace, self.error
        )
    }
}

impl StructuredLog for NamespaceSetupFailed<'_> {
    fn log(&self) {
        tracing::error!(
            namespace = self.namespace,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "namespace_setup_failed",
            span_name = name,
            namespace = self.namespace,
            error = %self.error,
        )
    }
}

/// A namespace was removed from the registry and its workers told to stop.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NamespaceDestroyed<'a> {
    pub namespace: &'a str,
    pub notified: usize,
}

impl Display for NamespaceDestroyed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Namespace {} destroyed, {} worker(s) notified",
            self.namespace, self.notified
        )
    }
}

impl StructuredLog for NamespaceDestroyed<'_> {
    fn log(&self) {
        tracing::info!(
            namespace = self.namespace,
            notified = self.notified,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "namespace_destroyed",
            span_name = name,
            namespace = self.namespace,
            notified = self.notified,
        )
    }
}

/// An inbox received an envelope addressed to another namespace.
///
/// # Log Level
/// `warn!` - The envelope is dropped
pub struct ForeignMessageIgnored<'a> {
    pub namespace: &'a str,
    pub received: &'a str,
    pub endpoint: Endpoint,
    pub message: &'static str,
}

impl Display for ForeignMessageIgnored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} of namespace {} ignored '{}' addressed to namespace {}",
            self.endpoint, self.namespace, self.message, self.received
        )
    }
}

impl StructuredLog for ForeignMessageIgnored<'_> {
    fn log(&self) {
        tracing::warn!(
            namespace = self.namespace,
            received = self.received,
            endpoint = %self.endpoint,
            message = self.message,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "foreign_message",
            span_name = name,
            namespace = self.namespace,
            received = self.received,
            endpoint = %self.endpoint,
        )
    }
}

/// A module was compiled for a namespace.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ModuleLoaded<'a> {
    pub module: &'a str,
    pub size_bytes: usize,
}

impl Display for ModuleLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Compiled WASM module: {} ({} bytes)",
            self.module, self.size_bytes
        )
    }
}

impl StructuredLog for ModuleLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            module = self.module,
            size_bytes = self.size_bytes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("module_loaded", span_name = name, module = self.module)
    }
}

/// A module file could not be read.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ModuleLoadFailed<'a> {
    pub module: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ModuleLoadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Failed to load WASM module '{}': {}",
            self.module, self.error
        )
    }
}

impl StructuredLog for ModuleLoadFailed<'_> {
    fn log(&self) {
        tracing::error!(module = self.module, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("module_load_failed", span_name = name, module = self.module)
    }
}
