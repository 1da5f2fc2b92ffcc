// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::runtime::{RuntimeError, RuntimeResult};
use wasmtime::{Config, Engine};

/// Create the engine every namespace of a pool compiles against.
///
/// Threads and shared memories are required; everything else stays at the
/// settings a WASI preview1 program built by a stock toolchain expects.
pub fn create_engine() -> RuntimeResult<Engine> {
    let mut config = Config::new();

    config.wasm_threads(true);
    config.shared_memory(true);
    config.wasm_bulk_memory(true);
    config.wasm_multi_memory(false);
    config.wasm_memory64(false);
    config.wasm_component_model(false);

    // Threads are never interrupted from the host.
    config.consume_fuel(false);
    config.epoch_interruption(false);

    Engine::new(&config).map_err(|e| RuntimeError::EngineError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmtime::{MemoryType, SharedMemory};

    #[test]
    fn test_create_engine() {
        let engine = create_engine();
        assert!(engine.is_ok(), "Should create a threads-enabled engine");
    }

    #[test]
    fn test_engine_allows_shared_memory() {
        let engine = create_engine().unwrap();
        let memory = SharedMemory::new(&engine, MemoryType::shared(1, 2)).unwrap();
        assert_eq!(memory.size(), 1);
    }
}
