// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::atomics::WaitSlots;
use crate::config::{validate_config, ThreadsConfig};
use crate::errors::{ConfigError, ProtocolError, ThreadsError, ThreadsResult};
use crate::lifecycle::{spawn_coordinator, spawn_worker, ExitStatus};
use crate::namespace::{
    CoordinationRecord, NamespaceId, NamespaceRegistry, SharedResources, WorkerSettings,
};
use crate::observability::messages::namespace::{NamespaceCreated, NamespaceSetupFailed};
use crate::observability::messages::StructuredLog;
use crate::pool::{destroy_namespace, destroy_record, NamespaceHandle};
use crate::protocol::{mailbox, Endpoint, Envelope, Message, Role, ThreadData};
use crate::runtime::{create_engine, load_module, shared_memory_for, ModuleSource, RuntimeError};
use crate::traits::{DefaultHook, Hooks, InstanceHook};
use std::sync::Arc;
use wasmtime::{Engine, SharedMemory};

/// Extra inputs to [`ThreadPool::launch_with`] that do not fit a config file.
#[derive(Default)]
pub struct LaunchOptions {
    /// Overrides `module` of the configuration.
    pub module: Option<ModuleSource>,
    /// Hook for every worker.
    pub hook: Option<Arc<dyn InstanceHook>>,
    /// Hook for spawned threads only; they use `hook` when absent.
    pub thread_hook: Option<Arc<dyn InstanceHook>>,
}

impl LaunchOptions {
    pub fn module(mut self, source: ModuleSource) -> Self {
        self.module = Some(source);
        self
    }

    pub fn hook(mut self, hook: impl InstanceHook + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn thread_hook(mut self, hook: impl InstanceHook + 'static) -> Self {
        self.thread_hook = Some(Arc::new(hook));
        self
    }
}

/// Launches namespaces against one engine and one registry.
///
/// # Example
/// ```no_run
/// use wasi_worker_threads::config::ThreadsConfig;
/// use wasi_worker_threads::pool::ThreadPool;
///
/// # async fn run() -> wasi_worker_threads::errors::ThreadsResult<()> {
/// let pool = ThreadPool::new()?;
/// let mut handle = pool.launch(ThreadsConfig::for_module("app.wasm")).await?;
/// let status = handle.wait().await?;
/// println!("{} finished: {status}", handle.namespace());
/// handle.destroy().await?;
/// # Ok(())
/// # }
/// ```
pub struct ThreadPool {
    engine: Engine,
    registry: Arc<NamespaceRegistry>,
}

impl ThreadPool {
    pub fn new() -> ThreadsResult<Self> {
        Self::with_registry(Arc::new(NamespaceRegistry::new()))
    }

    /// Pool sharing `registry` with other pools.
    pub fn with_registry(registry: Arc<NamespaceRegistry>) -> ThreadsResult<Self> {
        Ok(Self {
            engine: create_engine()?,
            registry,
        })
    }

    /// Engine to precompile modules with for [`ModuleSource::Compiled`].
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.registry
    }

    pub async fn launch(&self, config: ThreadsConfig) -> ThreadsResult<NamespaceHandle> {
        self.launch_with(config, LaunchOptions::default()).await
    }

    /// Register the namespace, build the shared module, memory and wait slots,
    /// start the coordinator and the main worker, and resolve once the main
    /// instance exists.
    ///
    /// On any failure the namespace is unregistered again and already started
    /// workers are told to stop.
    pub async fn launch_with(
        &self,
        config: ThreadsConfig,
        options: LaunchOptions,
    ) -> ThreadsResult<NamespaceHandle> {
        validate_config(&config)?;
        let namespace = match config.namespace.as_deref() {
            Some(id) => NamespaceId::new(id)?,
            None => NamespaceId::generate(),
        };

        let record = self.registry.create(namespace.clone(), Role::Main)?;
        let mut guard = SetupGuard {
            registry: &self.registry,
            record: record.clone(),
            armed: true,
        };

        match self.setup(record, config, options).await {
            Ok(handle) => {
                guard.armed = false;
                Ok(handle)
            }
            Err(e) => {
                NamespaceSetupFailed {
                    namespace: namespace.as_str(),
                    error: &e,
                }
                .log();
                Err(e)
            }
        }
    }

    /// Destroy a namespace by id; returns how many endpoints were notified.
    pub fn destroy(&self, namespace: &str) -> Result<usize, ProtocolError> {
        destroy_namespace(&self.registry, namespace)
    }

    async fn setup(
        &self,
        record: Arc<CoordinationRecord>,
        config: ThreadsConfig,
        options: LaunchOptions,
    ) -> ThreadsResult<NamespaceHandle> {
        let namespace = record.namespace().clone();

        let source = match (options.module, config.module.as_ref()) {
            (Some(source), _) => source,
            (None, Some(path)) => ModuleSource::Path(path.clone()),
            (None, None) => return Err(ConfigError::MissingModule.into()),
        };
        let module = load_module(&self.engine, source)?;
        let (memory_import, memory_type) = shared_memory_for(&module, config.memory)?;
        let memory = SharedMemory::new(&self.engine, memory_type)
            .map_err(|e| RuntimeError::MemoryError(e.to_string()))?;
        let slots = Arc::new(WaitSlots::new(&self.engine, config.wait_slots)?);

        let hooks = Hooks::new(
            options.hook.unwrap_or_else(|| Arc::new(DefaultHook)),
            options.thread_hook,
        );
        let resources = Arc::new(SharedResources {
            engine: self.engine.clone(),
            module,
            memory,
            memory_import,
            slots,
            wasi: config.wasi.clone(),
            settings: WorkerSettings {
                spawn_timeout: config.spawn_timeout(),
                thread_entry: config.thread_entry.clone(),
                init_method: config.init_method.clone(),
                no_wasi_start: config.no_wasi_start,
            },
            hooks,
        });
        record.attach_resources(resources.clone());

        let (leader, mut inbox) = mailbox(&namespace, Endpoint::Leader);

        let (coordinator, coordinator_join) =
            spawn_coordinator(namespace.clone(), resources.clone(), leader.clone())
                .map_err(RuntimeError::IoError)?;
        record.attach_coordinator(coordinator.clone());
        match inbox.recv().await {
            Some(Envelope {
                message: Message::CoordinatorReady,
                ..
            }) => {}
            other => return Err(startup_error(Endpoint::Coordinator, other)),
        }

        let (main, main_join) =
            spawn_worker(&namespace, Endpoint::Main).map_err(RuntimeError::IoError)?;
        record.attach_main(main.clone());
        let data = ThreadData {
            role: Role::Main,
            resources: resources.clone(),
            thread_id: None,
            start_arg: 0,
            coordinator,
            parent: leader,
        };
        main.send(Endpoint::Leader, Message::InitThreadData(Box::new(data)))?;
        match inbox.recv().await {
            Some(Envelope {
                from: Endpoint::Main,
                message: Message::ThreadReady,
                ..
            }) => {}
            other => return Err(startup_error(Endpoint::Main, other)),
        }

        NamespaceCreated {
            namespace: namespace.as_str(),
            wait_slots: config.wait_slots,
            memory_pages: resources.memory.size(),
        }
        .log();

        Ok(NamespaceHandle::new(
            self.registry.clone(),
            record,
            inbox,
            main_join,
            coordinator_join,
        ))
    }
}

/// Turn whatever arrived instead of the expected readiness message into an error.
fn startup_error(worker: Endpoint, envelope: Option<Envelope>) -> ThreadsError {
    let reason = match envelope.map(|e| e.message) {
        Some(Message::Exited(ExitStatus::Failed(error))) => {
            return Arc::try_unwrap(error).unwrap_or_else(|shared| ThreadsError::WorkerLost {
                worker: worker.to_string(),
                reason: shared.to_string(),
            });
        }
        Some(Message::Exited(status)) => status.to_string(),
        Some(other) => format!("unexpected message '{}'", other.name()),
        None => "inbox closed".to_string(),
    };
    ThreadsError::WorkerLost {
        worker: worker.to_string(),
        reason,
    }
}

/// Unregisters a namespace whose setup did not complete.
struct SetupGuard<'a> {
    registry: &'a NamespaceRegistry,
    record: Arc<CoordinationRecord>,
    armed: bool,
}

impl Drop for SetupGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            // Already gone if someone destroyed it by id mid-setup.
            let _ = destroy_record(self.registry, &self.record);
        }
    }
}
