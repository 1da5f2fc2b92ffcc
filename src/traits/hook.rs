use crate::namespace::NamespaceId;
use crate::protocol::Role;
use crate::runtime::WorkerContext;
use std::fmt;
use std::sync::Arc;
use wasmtime::Linker;
use wasmtime_wasi::p1::WasiP1Ctx;

/// Per-worker customization, called on the worker's own OS thread right
/// before its instance is created.
///
/// WASI preview1 and `thread-spawn` are already defined in `linker`; anything
/// the hook defines shadows them.
pub trait InstanceHook: Send + Sync {
    fn configure(
        &self,
        namespace: &NamespaceId,
        role: Role,
        linker: &mut Linker<WorkerContext>,
    ) -> anyhow::Result<InstanceSetup> {
        let _ = (namespace, role, linker);
        Ok(InstanceSetup::default())
    }
}

impl<F> InstanceHook for F
where
    F: Fn(&NamespaceId, Role, &mut Linker<WorkerContext>) -> anyhow::Result<InstanceSetup>
        + Send
        + Sync,
{
    fn configure(
        &self,
        namespace: &NamespaceId,
        role: Role,
        linker: &mut Linker<WorkerContext>,
    ) -> anyhow::Result<InstanceSetup> {
        self(namespace, role, linker)
    }
}

/// What a hook hands back.
#[derive(Default)]
pub struct InstanceSetup {
    /// Custom WASI context. Must not be combined with declarative WASI options.
    pub wasi: Option<WasiP1Ctx>,
    /// Skip `_start` on the main instance.
    pub no_wasi_start: bool,
}

/// Hook that changes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHook;

impl InstanceHook for DefaultHook {}

/// Hooks of a namespace: one for the main worker and, optionally, a separate
/// one for spawned threads.
#[derive(Clone)]
pub struct Hooks {
    main: Arc<dyn InstanceHook>,
    thread: Option<Arc<dyn InstanceHook>>,
}

impl Hooks {
    pub fn new(main: Arc<dyn InstanceHook>, thread: Option<Arc<dyn InstanceHook>>) -> Self {
        Self { main, thread }
    }

    /// Thread workers fall back to the main hook.
    pub fn for_role(&self, role: Role) -> &dyn InstanceHook {
        match (role, &self.thread) {
            (Role::ThreadWorker, Some(thread)) => thread.as_ref(),
            _ => self.main.as_ref(),
        }
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new(Arc::new(DefaultHook), None)
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("separate_thread_hook", &self.thread.is_some())
            .finish()
    }
}
