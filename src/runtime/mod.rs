// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The wasmtime side: engine, module loading and per-worker instances.

pub mod detector;
mod engine;
mod error;
mod instance;
mod loader;

pub use engine::create_engine;
pub use error::{RuntimeError, RuntimeResult, UNSUPPORTED_COMPONENT};
pub use instance::{build_wasi, exit_status, WorkerContext, WorkerInstance};
pub use loader::{lacks_memory_export, load_module, shared_memory_for, MemoryImport, ModuleSource};
