// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fixtures shared by unit tests that need a compiled threaded module.

use crate::atomics::WaitSlots;
use crate::config::WasiOptions;
use crate::namespace::{NamespaceId, SharedResources, WorkerSettings};
use crate::protocol::{mailbox, Endpoint, Spawner};
use crate::runtime::{create_engine, load_module, shared_memory_for, ModuleSource};
use crate::traits::Hooks;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};
use wasmtime::{Engine, SharedMemory};

pub(crate) struct Fixture {
    pub namespace: NamespaceId,
    pub wasi: Option<WasiOptions>,
    pub hooks: Hooks,
    pub settings: WorkerSettings,
    pub wait_slots: u32,
    engine: Engine,
    wat: String,
    built: OnceLock<Arc<SharedResources>>,
}

impl Fixture {
    pub fn new(wat: &str) -> Self {
        Self {
            namespace: NamespaceId::generate(),
            wasi: Some(WasiOptions {
                inherit_stdio: false,
                ..WasiOptions::default()
            }),
            hooks: Hooks::default(),
            settings: WorkerSettings {
                spawn_timeout: Duration::from_secs(5),
                thread_entry: "wasi_thread_start".to_string(),
                init_method: None,
                no_wasi_start: false,
            },
            wait_slots: 64,
            engine: create_engine().unwrap(),
            wat: wat.to_string(),
            built: OnceLock::new(),
        }
    }

    /// Compile on first use; later changes to the public fields are ignored.
    pub fn resources(&self) -> Arc<SharedResources> {
        self.built
            .get_or_init(|| {
                let source = ModuleSource::Bytes(self.wat.as_bytes().to_vec());
                let module = load_module(&self.engine, source).unwrap();
                let (memory_import, ty) = shared_memory_for(&module, None).unwrap();
                let memory = SharedMemory::new(&self.engine, ty).unwrap();
                let slots = Arc::new(WaitSlots::new(&self.engine, self.wait_slots).unwrap());
                Arc::new(SharedResources {
                    engine: self.engine.clone(),
                    module,
                    memory,
                    memory_import,
                    slots,
                    wasi: self.wasi.clone(),
                    settings: self.settings.clone(),
                    hooks: self.hooks.clone(),
                })
            })
            .clone()
    }
}

/// A spawner whose coordinator is already gone.
pub(crate) fn spawner_for(fixture: &Fixture) -> Spawner {
    let resources = fixture.resources();
    let (outbox, _) = mailbox(&fixture.namespace, Endpoint::Coordinator);
    Spawner::new(
        fixture.namespace.clone(),
        Endpoint::Main,
        resources.slots.clone(),
        outbox,
        resources.settings.spawn_timeout,
    )
}

/// Atomically read the `i32` at the 4-byte aligned address `addr`.
pub(crate) fn read_i32(memory: &SharedMemory, addr: usize) -> i32 {
    assert_eq!(addr % 4, 0);
    let cell = memory.data()[addr].get().cast::<i32>();
    // SAFETY: the address is aligned, in bounds, and all guest accesses to
    // shared memory are atomic or race-free in the test modules.
    unsafe { AtomicI32::from_ptr(cell) }.load(Ordering::SeqCst)
}

/// Poll `condition` until it holds or `timeout` passes.
pub(crate) fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
