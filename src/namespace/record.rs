// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::atomics::WaitSlots;
use crate::config::WasiOptions;
use crate::namespace::NamespaceId;
use crate::protocol::{Endpoint, Message, Outbox, Role};
use crate::runtime::MemoryImport;
use crate::traits::Hooks;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use wasmtime::{Engine, Module, SharedMemory};

/// Per-worker settings copied out of the namespace configuration.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub spawn_timeout: Duration,
    pub thread_entry: String,
    pub init_method: Option<String>,
    pub no_wasi_start: bool,
}

/// Everything a worker needs to instantiate the module of its namespace.
///
/// Built once by the leader; workers only ever hold it behind an `Arc`.
pub struct SharedResources {
    pub engine: Engine,
    pub module: Module,
    pub memory: SharedMemory,
    pub memory_import: MemoryImport,
    pub slots: Arc<WaitSlots>,
    pub wasi: Option<WasiOptions>,
    pub settings: WorkerSettings,
    pub hooks: Hooks,
}

/// Registry entry of a live namespace.
///
/// The record is registered before any resource is allocated; the shared
/// resources and the leader's outboxes are attached as setup progresses.
pub struct CoordinationRecord {
    namespace: NamespaceId,
    role: Role,
    resources: OnceLock<Arc<SharedResources>>,
    coordinator: OnceLock<Outbox>,
    main: OnceLock<Outbox>,
}

impl CoordinationRecord {
    pub(crate) fn new(namespace: NamespaceId, role: Role) -> Self {
        Self {
            namespace,
            role,
            resources: OnceLock::new(),
            coordinator: OnceLock::new(),
            main: OnceLock::new(),
        }
    }

    pub fn namespace(&self) -> &NamespaceId {
        &self.namespace
    }

    /// Role of the endpoint that created the namespace.
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn resources(&self) -> Option<&Arc<SharedResources>> {
        self.resources.get()
    }

    /// Returns `false` if resources were already attached.
    pub fn attach_resources(&self, resources: Arc<SharedResources>) -> bool {
        self.resources.set(resources).is_ok()
    }

    pub fn attach_coordinator(&self, outbox: Outbox) -> bool {
        self.coordinator.set(outbox).is_ok()
    }

    pub fn attach_main(&self, outbox: Outbox) -> bool {
        self.main.set(outbox).is_ok()
    }

    /// Send `Destroy` from the leader to the coordinator and the main worker.
    ///
    /// Returns how many of them were still listening.
    pub fn teardown(&self) -> usize {
        [self.coordinator.get(), self.main.get()]
            .into_iter()
            .flatten()
            .filter(|outbox| {
                let delivered = outbox.send(Endpoint::Leader, Message::Destroy).is_ok();
                if !delivered {
                    tracing::debug!(
                        namespace = self.namespace.as_str(),
                        endpoint = %outbox.endpoint(),
                        "Destroy not delivered, endpoint already stopped"
                    );
                }
                delivered
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mailbox;

    #[test]
    fn test_teardown_notifies_attached_endpoints() {
        let namespace = NamespaceId::new("wasm_rec").unwrap();
        let record = CoordinationRecord::new(namespace.clone(), Role::Main);
        assert_eq!(record.teardown(), 0);

        let (coordinator, mut coordinator_inbox) = mailbox(&namespace, Endpoint::Coordinator);
        let (main, main_inbox) = mailbox(&namespace, Endpoint::Main);
        assert!(record.attach_coordinator(coordinator.clone()));
        assert!(!record.attach_coordinator(coordinator));
        assert!(record.attach_main(main));
        drop(main_inbox);

        assert_eq!(record.teardown(), 1);
        let envelope = coordinator_inbox.try_recv().unwrap();
        assert_eq!(envelope.from, Endpoint::Leader);
        assert!(matches!(envelope.message, Message::Destroy));
    }
}
