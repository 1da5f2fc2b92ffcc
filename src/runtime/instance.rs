// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One WASM instance bound to the shared memory of its namespace.
//!
//! A [`WorkerInstance`] is created and driven on the worker's own OS thread;
//! only the module, the engine and the shared memory cross threads.

use crate::config::WasiOptions;
use crate::errors::{ConfigError, ThreadsResult};
use crate::lifecycle::ExitStatus;
use crate::namespace::{NamespaceId, SharedResources};
use crate::protocol::{self, Role, Spawner, ThreadId};
use crate::runtime::{RuntimeError, RuntimeResult};
use wasmtime::{Instance, Linker, Store};
use wasmtime_wasi::p1::{self, WasiP1Ctx};
use wasmtime_wasi::{DirPerms, FilePerms, I32Exit, WasiCtxBuilder};

const WASI_START: &str = "_start";

/// Store data of every worker.
pub struct WorkerContext {
    pub wasi: WasiP1Ctx,
    pub spawner: Spawner,
}

fn spawner_of(cx: &WorkerContext) -> &Spawner {
    &cx.spawner
}

pub struct WorkerInstance {
    store: Store<WorkerContext>,
    instance: Instance,
    role: Role,
    no_wasi_start: bool,
}

impl WorkerInstance {
    /// Link WASI, `thread-spawn`, the hook's imports and the shared memory,
    /// then instantiate the namespace's module.
    pub fn instantiate(
        resources: &SharedResources,
        namespace: &NamespaceId,
        role: Role,
        spawner: Spawner,
    ) -> ThreadsResult<Self> {
        let mut linker: Linker<WorkerContext> = Linker::new(&resources.engine);
        linker.allow_shadowing(true);
        p1::add_to_linker_sync(&mut linker, |cx: &mut WorkerContext| &mut cx.wasi)
            .map_err(RuntimeError::ExecutionError)?;
        protocol::add_to_linker(&mut linker, spawner_of).map_err(RuntimeError::ExecutionError)?;

        let setup = resources
            .hooks
            .for_role(role)
            .configure(namespace, role, &mut linker)
            .map_err(|e| RuntimeError::Hook(format!("{e:#}")))?;

        let wasi = resolve_wasi(role, setup.wasi, resources.wasi.as_ref())?;
        let mut store = Store::new(&resources.engine, WorkerContext { wasi, spawner });

        let import = &resources.memory_import;
        linker
            .define(&store, &import.module, &import.name, resources.memory.clone())
            .map_err(RuntimeError::ExecutionError)?;

        let instance = linker
            .instantiate(&mut store, &resources.module)
            .map_err(|e| RuntimeError::ModuleError(format!("{e:#}")))?;

        Ok(Self {
            store,
            instance,
            role,
            no_wasi_start: resources.settings.no_wasi_start || setup.no_wasi_start,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Run `_start` (unless disabled or absent), then `init_method` if given.
    pub fn run_main(&mut self, init_method: Option<&str>) -> ExitStatus {
        if !self.no_wasi_start && self.instance.get_func(&mut self.store, WASI_START).is_some() {
            if let Err(status) = self.call_nullary(WASI_START) {
                return status;
            }
        }

        if let Some(method) = init_method {
            if let Err(status) = self.call_nullary(method) {
                return status;
            }
        }

        ExitStatus::Returned
    }

    /// Call the thread entry export with `(thread_id, start_arg)`.
    pub fn run_thread(&mut self, entry: &str, thread_id: ThreadId, start_arg: i32) -> ExitStatus {
        let func = match self
            .instance
            .get_typed_func::<(i32, i32), ()>(&mut self.store, entry)
        {
            Ok(func) => func,
            Err(e) => return missing_export(entry, e),
        };

        match func.call(&mut self.store, (thread_id.as_i32(), start_arg)) {
            Ok(()) => ExitStatus::Returned,
            Err(e) => exit_status(e),
        }
    }

    fn call_nullary(&mut self, name: &str) -> Result<(), ExitStatus> {
        let func = self
            .instance
            .get_typed_func::<(), ()>(&mut self.store, name)
            .map_err(|e| missing_export(name, e))?;
        func.call(&mut self.store, ()).map_err(exit_status)
    }
}

fn missing_export(name: &str, error: anyhow::Error) -> ExitStatus {
    ExitStatus::failed(RuntimeError::MissingExport {
        name: name.to_string(),
        reason: error.to_string(),
    })
}

/// Map an error escaping guest code to an exit status.
pub fn exit_status(error: anyhow::Error) -> ExitStatus {
    match error.downcast_ref::<I32Exit>() {
        Some(exit) => ExitStatus::Exited(exit.0),
        None => ExitStatus::Trapped(format!("{error:#}")),
    }
}

fn resolve_wasi(
    role: Role,
    custom: Option<WasiP1Ctx>,
    options: Option<&WasiOptions>,
) -> ThreadsResult<WasiP1Ctx> {
    match (custom, options) {
        (Some(_), Some(_)) => Err(ConfigError::WasiConflict { role }.into()),
        (None, None) => Err(ConfigError::MissingWasi { role }.into()),
        (Some(ctx), None) => Ok(ctx),
        (None, Some(options)) => Ok(build_wasi(options)?),
    }
}

/// Build a preview1 context from declarative options.
pub fn build_wasi(options: &WasiOptions) -> RuntimeResult<WasiP1Ctx> {
    let mut builder = WasiCtxBuilder::new();
    builder.args(options.args.as_slice());
    for (key, value) in &options.env {
        builder.env(key, value);
    }
    if options.inherit_stdio {
        builder.inherit_stdio();
    }
    for preopen in &options.preopens {
        builder
            .preopened_dir(&preopen.host, &preopen.guest, DirPerms::all(), FilePerms::all())
            .map_err(RuntimeError::ExecutionError)?;
    }
    Ok(builder.build_p1())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ThreadsError;
    use crate::testing::{read_i32, spawner_for, Fixture};
    use crate::traits::{Hooks, InstanceSetup};
    use std::sync::Arc;

    const MAIN: &str = r#"
        (module
          (import "env" "memory" (memory 1 1 shared))
          (func (export "_start")
            (i32.store (i32.const 0) (i32.const 7)))
          (func (export "main2")
            (i32.store (i32.const 4) (i32.const 8)))
          (func (export "wasi_thread_start") (param $tid i32) (param $arg i32)
            (i32.store (local.get $arg) (local.get $tid))))
    "#;

    fn instantiate(fixture: &Fixture, role: Role) -> ThreadsResult<WorkerInstance> {
        let resources = fixture.resources();
        WorkerInstance::instantiate(&resources, &fixture.namespace, role, spawner_for(fixture))
    }

    #[test]
    fn test_main_runs_start_then_init_method() {
        let fixture = Fixture::new(MAIN);
        let mut instance = instantiate(&fixture, Role::Main).unwrap();
        assert_eq!(instance.role(), Role::Main);

        let status = instance.run_main(Some("main2"));
        assert!(matches!(status, ExitStatus::Returned), "{status}");
        assert_eq!(read_i32(&fixture.resources().memory, 0), 7);
        assert_eq!(read_i32(&fixture.resources().memory, 4), 8);
    }

    #[test]
    fn test_no_wasi_start_skips_start() {
        let mut fixture = Fixture::new(MAIN);
        fixture.settings.no_wasi_start = true;
        let mut instance = instantiate(&fixture, Role::Main).unwrap();

        assert!(instance.run_main(None).is_success());
        assert_eq!(read_i32(&fixture.resources().memory, 0), 0);
    }

    #[test]
    fn test_missing_init_method_fails() {
        let fixture = Fixture::new(MAIN);
        let mut instance = instantiate(&fixture, Role::Main).unwrap();

        let status = instance.run_main(Some("absent"));
        assert!(matches!(status, ExitStatus::Failed(_)), "{status}");
    }

    #[test]
    fn test_thread_entry_receives_id_and_argument() {
        let fixture = Fixture::new(MAIN);
        let mut instance = instantiate(&fixture, Role::ThreadWorker).unwrap();

        let status = instance.run_thread("wasi_thread_start", ThreadId::new(5).unwrap(), 64);
        assert!(status.is_success(), "{status}");
        assert_eq!(read_i32(&fixture.resources().memory, 64), 5);
    }

    #[test]
    fn test_missing_thread_entry_fails() {
        let fixture = Fixture::new(MAIN);
        let mut instance = instantiate(&fixture, Role::ThreadWorker).unwrap();

        let status = instance.run_thread("nope", ThreadId::new(1).unwrap(), 0);
        let ExitStatus::Failed(error) = status else {
            panic!("expected failure, got {status}");
        };
        assert!(matches!(
            error.as_ref(),
            ThreadsError::Runtime(RuntimeError::MissingExport { .. })
        ));
    }

    #[test]
    fn test_proc_exit_and_trap_are_reported() {
        let wat = r#"
            (module
              (import "wasi_snapshot_preview1" "proc_exit" (func $exit (param i32)))
              (import "env" "memory" (memory 1 1 shared))
              (export "memory" (memory 0))
              (func (export "_start") (call $exit (i32.const 3)))
              (func (export "boom") unreachable))
        "#;
        let fixture = Fixture::new(wat);

        let mut instance = instantiate(&fixture, Role::Main).unwrap();
        assert!(matches!(instance.run_main(None), ExitStatus::Exited(3)));

        let mut fixture = Fixture::new(wat);
        fixture.settings.no_wasi_start = true;
        let mut instance = instantiate(&fixture, Role::Main).unwrap();
        assert!(matches!(instance.run_main(Some("boom")), ExitStatus::Trapped(_)));
    }

    fn custom_wasi(
        _: &NamespaceId,
        _: Role,
        _: &mut Linker<WorkerContext>,
    ) -> anyhow::Result<InstanceSetup> {
        Ok(InstanceSetup {
            wasi: Some(WasiCtxBuilder::new().build_p1()),
            no_wasi_start: false,
        })
    }

    fn host_value(
        _: &NamespaceId,
        role: Role,
        linker: &mut Linker<WorkerContext>,
    ) -> anyhow::Result<InstanceSetup> {
        assert_eq!(role, Role::Main);
        linker.func_wrap("env", "host_value", || 99)?;
        custom_wasi(&NamespaceId::generate(), role, linker)
    }

    fn refusing(
        _: &NamespaceId,
        _: Role,
        _: &mut Linker<WorkerContext>,
    ) -> anyhow::Result<InstanceSetup> {
        Err(anyhow::anyhow!("no capabilities for this worker"))
    }

    #[test]
    fn test_custom_wasi_conflicts_with_options() {
        let mut fixture = Fixture::new(MAIN);
        fixture.hooks = Hooks::new(Arc::new(custom_wasi), None);

        let err = instantiate(&fixture, Role::ThreadWorker).err().unwrap();
        assert!(err.to_string().starts_with("wasi_worker"));
        assert!(err.to_string().contains("can not both be provided"));
    }

    #[test]
    fn test_missing_wasi_is_rejected() {
        let mut fixture = Fixture::new(MAIN);
        fixture.wasi = None;

        let err = instantiate(&fixture, Role::Main).err().unwrap();
        assert!(matches!(
            err,
            ThreadsError::Config(ConfigError::MissingWasi { role: Role::Main })
        ));
    }

    #[test]
    fn test_hook_supplies_imports_and_context() {
        let wat = r#"
            (module
              (import "env" "host_value" (func $host (result i32)))
              (import "env" "memory" (memory 1 1 shared))
              (func (export "_start")
                (i32.store (i32.const 8) (call $host))))
        "#;
        let mut fixture = Fixture::new(wat);
        fixture.wasi = None;
        fixture.hooks = Hooks::new(Arc::new(host_value), None);

        let mut instance = instantiate(&fixture, Role::Main).unwrap();
        assert!(instance.run_main(None).is_success());
        assert_eq!(read_i32(&fixture.resources().memory, 8), 99);
    }

    #[test]
    fn test_failing_hook_is_reported() {
        let mut fixture = Fixture::new(MAIN);
        fixture.hooks = Hooks::new(Arc::new(refusing), None);

        let err = instantiate(&fixture, Role::Main).err().unwrap();
        assert!(matches!(err, ThreadsError::Runtime(RuntimeError::Hook(_))));
    }
}
