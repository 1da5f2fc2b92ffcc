// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Module loading and shared memory discovery.

use crate::config::MemorySetting;
use crate::observability::messages::namespace::{ModuleLoadFailed, ModuleLoaded};
use crate::observability::messages::StructuredLog;
use crate::runtime::detector::ensure_core_module;
use crate::runtime::{RuntimeError, RuntimeResult};
use std::fmt;
use std::path::PathBuf;
use wasmtime::{Engine, MemoryType, Module};

/// Maximum accepted module size (256 MiB).
const MAX_MODULE_SIZE: usize = 256 * 1024 * 1024;

const WASI_PREVIEW1: &str = "wasi_snapshot_preview1";

/// Where the module of a namespace comes from.
pub enum ModuleSource {
    /// Read and compile a file.
    Path(PathBuf),
    /// Compile raw bytes (binary or text format).
    Bytes(Vec<u8>),
    /// Reuse a module compiled with the pool's engine.
    Compiled(Module),
}

impl fmt::Debug for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Compiled(_) => f.write_str("Compiled"),
        }
    }
}

/// The `(module, name)` pair under which a module imports its shared memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImport {
    pub module: String,
    pub name: String,
}

/// Compile `source` with `engine`, rejecting component binaries.
pub fn load_module(engine: &Engine, source: ModuleSource) -> RuntimeResult<Module> {
    let (label, bytes) = match source {
        ModuleSource::Compiled(module) => {
            if !Engine::same(module.engine(), engine) {
                return Err(RuntimeError::EngineError(
                    "module was compiled with a different engine".to_string(),
                ));
            }
            return Ok(module);
        }
        ModuleSource::Path(path) => {
            let label = path.display().to_string();
            let bytes = std::fs::read(&path).map_err(|e| {
                ModuleLoadFailed {
                    module: &label,
                    error: &e,
                }
                .log();
                RuntimeError::IoError(e)
            })?;
            (label, bytes)
        }
        ModuleSource::Bytes(bytes) => ("<bytes>".to_string(), bytes),
    };

    if bytes.len() > MAX_MODULE_SIZE {
        return Err(RuntimeError::ModuleError(format!(
            "WASM module too large: {} bytes (max: {} bytes)",
            bytes.len(),
            MAX_MODULE_SIZE
        )));
    }

    // Text format goes straight to the compiler; wasmparser only reads binaries.
    if bytes.starts_with(b"\0asm") {
        ensure_core_module(&bytes)?;
    }

    let module =
        Module::new(engine, &bytes).map_err(|e| RuntimeError::ModuleError(e.to_string()))?;

    ModuleLoaded {
        module: &label,
        size_bytes: bytes.len(),
    }
    .log();

    Ok(module)
}

/// Find the shared memory import of `module` and the memory type to create for it.
///
/// An explicit `setting` overrides the limits declared by the import.
///
/// WASI preview1 calls read and write guest buffers through the export named
/// `memory`, so a module using them must also re-export its imported memory
/// (`--import-memory --export-memory`). A missing export is logged here; the
/// first such call traps.
pub fn shared_memory_for(
    module: &Module,
    setting: Option<MemorySetting>,
) -> RuntimeResult<(MemoryImport, MemoryType)> {
    for import in module.imports() {
        let Some(ty) = import.ty().memory().cloned() else {
            continue;
        };
        if !ty.is_shared() {
            return Err(RuntimeError::MissingSharedMemory(format!(
                "memory {}.{} is not shared; wasi-threads modules must import a shared memory",
                import.module(),
                import.name()
            )));
        }

        let ty = match setting {
            Some(setting) => MemoryType::shared(setting.initial, setting.maximum),
            None => ty,
        };
        let memory_import = MemoryImport {
            module: import.module().to_string(),
            name: import.name().to_string(),
        };
        if lacks_memory_export(module) {
            tracing::warn!(
                module = memory_import.module.as_str(),
                name = memory_import.name.as_str(),
                "module imports WASI preview1 but does not export \"memory\"; WASI calls will trap"
            );
        }
        return Ok((memory_import, ty));
    }

    Err(RuntimeError::MissingSharedMemory(
        "no memory import found".to_string(),
    ))
}

/// `true` for a module that calls WASI preview1 without exporting `memory`.
pub fn lacks_memory_export(module: &Module) -> bool {
    let uses_wasi = module
        .imports()
        .any(|import| import.module() == WASI_PREVIEW1);
    let exports_memory = module
        .exports()
        .any(|export| export.name() == "memory" && export.ty().memory().is_some());
    uses_wasi && !exports_memory
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::create_engine;
    use std::io::Write;

    const SHARED: &str = r#"(module (import "env" "memory" (memory 1 4 shared)))"#;

    #[test]
    fn test_load_from_bytes_and_find_import() {
        let engine = create_engine().unwrap();
        let module = load_module(&engine, ModuleSource::Bytes(SHARED.as_bytes().to_vec())).unwrap();

        let (import, ty) = shared_memory_for(&module, None).unwrap();
        assert_eq!(import.module, "env");
        assert_eq!(import.name, "memory");
        assert!(ty.is_shared());
        assert_eq!(ty.minimum(), 1);
        assert_eq!(ty.maximum(), Some(4));
    }

    #[test]
    fn test_memory_setting_overrides_declared_limits() {
        let engine = create_engine().unwrap();
        let module = load_module(&engine, ModuleSource::Bytes(SHARED.as_bytes().to_vec())).unwrap();

        let setting = MemorySetting {
            initial: 2,
            maximum: 4,
        };
        let (_, ty) = shared_memory_for(&module, Some(setting)).unwrap();
        assert_eq!(ty.minimum(), 2);
        assert_eq!(ty.maximum(), Some(4));
    }

    #[test]
    fn test_unshared_memory_rejected() {
        let engine = create_engine().unwrap();
        let wat = r#"(module (import "env" "memory" (memory 1)))"#;
        let module = load_module(&engine, ModuleSource::Bytes(wat.as_bytes().to_vec())).unwrap();

        assert!(matches!(
            shared_memory_for(&module, None),
            Err(RuntimeError::MissingSharedMemory(_))
        ));
    }

    #[test]
    fn test_module_without_memory_import_rejected() {
        let engine = create_engine().unwrap();
        let wat = r#"(module (memory 1))"#;
        let module = load_module(&engine, ModuleSource::Bytes(wat.as_bytes().to_vec())).unwrap();

        assert!(shared_memory_for(&module, None).is_err());
    }

    #[test]
    fn test_load_from_path() {
        let engine = create_engine().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&wat::parse_str(SHARED).unwrap()).unwrap();

        let module = load_module(&engine, ModuleSource::Path(file.path().to_path_buf()));
        assert!(module.is_ok());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let engine = create_engine().unwrap();
        let result = load_module(&engine, ModuleSource::Path("/no/such/module.wasm".into()));
        assert!(matches!(result, Err(RuntimeError::IoError(_))));
    }

    #[test]
    fn test_compiled_module_from_foreign_engine_rejected() {
        let engine = create_engine().unwrap();
        let other = create_engine().unwrap();
        let module = Module::new(&other, SHARED).unwrap();

        assert!(matches!(
            load_module(&engine, ModuleSource::Compiled(module)),
            Err(RuntimeError::EngineError(_))
        ));
    }

    #[test]
    fn test_wasi_module_must_reexport_memory() {
        let engine = create_engine().unwrap();
        let without = r#"
            (module
              (import "wasi_snapshot_preview1" "proc_exit" (func (param i32)))
              (import "env" "memory" (memory 1 1 shared)))
        "#;
        let with = r#"
            (module
              (import "wasi_snapshot_preview1" "proc_exit" (func (param i32)))
              (import "env" "memory" (memory 1 1 shared))
              (export "memory" (memory 0)))
        "#;

        assert!(lacks_memory_export(&Module::new(&engine, without).unwrap()));
        assert!(!lacks_memory_export(&Module::new(&engine, with).unwrap()));
        // No WASI imports, nothing to re-export.
        assert!(!lacks_memory_export(&Module::new(&engine, SHARED).unwrap()));
    }
}
