// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::protocol::Role;
use thiserror::Error;

/// Configuration errors. These are fatal: they abort the operation that
/// triggered them and leave no namespace registered behind.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The namespace already has a live coordination record.
    #[error("Already initialized as {namespace}.{role}")]
    NamespaceExists { namespace: String, role: Role },

    /// Namespace identifiers must not be empty.
    #[error("Namespace identifier must not be empty")]
    EmptyNamespace,

    /// Neither a module path, module bytes nor a compiled module was supplied.
    #[error("A WASM module is required (set `module` or pass one to the launcher)")]
    MissingModule,

    /// Neither declarative WASI options nor a custom context were supplied.
    #[error("{role}: WASI options or a custom WASI context is required")]
    MissingWasi { role: Role },

    /// Both declarative WASI options and a custom context were supplied.
    #[error("{role}: WASI options and a custom WASI context can not both be provided")]
    WasiConflict { role: Role },

    /// Wait slot array size outside the supported range.
    #[error("Wait slot count {requested} is out of range (must be between {min} and {max})")]
    InvalidWaitSlots { requested: u32, min: u32, max: u32 },

    /// Spawn timeout must be positive.
    #[error("Spawn timeout must be greater than zero")]
    InvalidSpawnTimeout,

    /// Shared memory limits are inconsistent.
    #[error("Invalid memory setting: initial {initial} pages exceeds maximum {maximum} pages")]
    InvalidMemory { initial: u32, maximum: u32 },

    /// The configuration file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse config file '{path}': {reason}")]
    Parse { path: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_exists_message_names_role() {
        let err = ConfigError::NamespaceExists {
            namespace: "wasm_abc".to_string(),
            role: Role::Main,
        };
        assert_eq!(err.to_string(), "Already initialized as wasm_abc.wasi_main");
    }

    #[test]
    fn test_wasi_conflict_message() {
        let err = ConfigError::WasiConflict { role: Role::ThreadWorker };
        assert!(err.to_string().contains("can not both be provided"));
        assert!(err.to_string().starts_with("wasi_worker"));
    }
}
