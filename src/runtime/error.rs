// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for the wasmtime collaborator: loading, compiling,
//! instantiating and running modules.

use thiserror::Error;

/// Message for component-model binaries, which can not share a linear memory
/// through `wasi-threads`.
pub const UNSUPPORTED_COMPONENT: &str = "Unsupported WASM binary: component model binaries can not \
be run with wasi-threads. Compile the program as a core module importing a shared memory.";

#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Invalid or malformed WASM binary.
    #[error("Invalid WASM binary: {0}")]
    InvalidWasmBinary(String),

    /// The binary is valid but not something this runtime can launch.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// The module does not import a shared linear memory.
    #[error("Module does not import a shared memory: {0}")]
    MissingSharedMemory(String),

    /// Shared memory creation or access error.
    #[error("Memory error: {0}")]
    MemoryError(String),

    /// Module compilation or instantiation error.
    #[error("WASM module error: {0}")]
    ModuleError(String),

    /// Wasmtime engine creation or configuration error.
    #[error("Engine creation error: {0}")]
    EngineError(String),

    /// A required export is absent or has the wrong signature.
    #[error("Missing export '{name}': {reason}")]
    MissingExport { name: String, reason: String },

    /// An instance hook refused to configure a worker.
    #[error("Instance hook failed: {0}")]
    Hook(String),

    /// File I/O error during module loading.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wasmtime runtime execution error.
    #[error("WASM execution error: {0}")]
    ExecutionError(#[from] wasmtime::Error),

    /// WASM binary parsing error from wasmparser.
    #[error("WASM parser error: {0}")]
    ParserError(#[from] wasmparser::BinaryReaderError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
