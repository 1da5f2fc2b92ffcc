// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The `wasi`.`thread-spawn` host function.
//!
//! The guest expects a synchronous answer while the thread is created by the
//! coordinator on another OS thread. The calling worker reserves a wait slot,
//! posts `CreateThread` carrying the slot ticket and parks on the slot until
//! the coordinator signals the new thread id (or a negative code) into it.

use crate::atomics::{WaitOutcome, WaitSlots};
use crate::errors::ProtocolError;
use crate::namespace::NamespaceId;
use crate::observability::messages::spawn::{
    SpawnFailed, SpawnRequested, SpawnTimedOut, ThreadSpawned,
};
use crate::observability::messages::StructuredLog;
use crate::protocol::{Endpoint, Message, Outbox, SpawnRequest};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wasmtime::{Caller, Linker};

/// Returned to the guest when no thread could be started (`-EAGAIN`).
pub const SPAWN_FAILED: i32 = -6;

/// Per-worker state behind `thread-spawn`.
#[derive(Clone)]
pub struct Spawner {
    namespace: NamespaceId,
    from: Endpoint,
    slots: Arc<WaitSlots>,
    coordinator: Outbox,
    timeout: Duration,
}

impl Spawner {
    pub fn new(
        namespace: NamespaceId,
        from: Endpoint,
        slots: Arc<WaitSlots>,
        coordinator: Outbox,
        timeout: Duration,
    ) -> Self {
        Self {
            namespace,
            from,
            slots,
            coordinator,
            timeout,
        }
    }

    /// Request a thread and block until it runs or the timeout passes.
    ///
    /// Returns the positive thread id, or a negative code when the thread
    /// could not be started. Only protocol violations are errors; they trap
    /// the calling guest.
    pub fn spawn(&self, start_arg: i32) -> Result<i32, ProtocolError> {
        let started = Instant::now();
        SpawnRequested {
            namespace: self.namespace.as_str(),
            from: self.from,
            start_arg,
        }
        .log();

        let ticket = match self.slots.reserve() {
            Ok(ticket) => ticket,
            Err(ProtocolError::SlotsExhausted { .. }) => {
                return Ok(self.failed(start_arg, SPAWN_FAILED, "no free wait slot"));
            }
            Err(e) => return Err(e),
        };

        let request = SpawnRequest { start_arg, ticket };
        if let Err(e) = self.coordinator.send(self.from, Message::CreateThread(request)) {
            self.slots.release(ticket)?;
            return Ok(self.failed(start_arg, SPAWN_FAILED, &e.to_string()));
        }

        match self.slots.wait(ticket, self.timeout)? {
            WaitOutcome::Completed(thread_id) if thread_id > 0 => {
                ThreadSpawned {
                    namespace: self.namespace.as_str(),
                    thread_id,
                    elapsed: started.elapsed(),
                }
                .log();
                Ok(thread_id)
            }
            WaitOutcome::Completed(code) => {
                Ok(self.failed(start_arg, code, "coordinator could not start the thread"))
            }
            WaitOutcome::TimedOut => {
                SpawnTimedOut {
                    namespace: self.namespace.as_str(),
                    start_arg,
                    timeout: self.timeout,
                }
                .log();
                Ok(SPAWN_FAILED)
            }
        }
    }

    fn failed(&self, start_arg: i32, code: i32, reason: &str) -> i32 {
        SpawnFailed {
            namespace: self.namespace.as_str(),
            start_arg,
            code,
            reason,
        }
        .log();
        code
    }
}

/// Define `wasi`.`thread-spawn` in `linker`, reading the [`Spawner`] out of the
/// store data with `get`.
pub fn add_to_linker<T: 'static>(
    linker: &mut Linker<T>,
    get: fn(&T) -> &Spawner,
) -> anyhow::Result<()> {
    linker.func_wrap(
        "wasi",
        "thread-spawn",
        move |caller: Caller<'_, T>, start_arg: i32| -> anyhow::Result<i32> {
            let spawner = get(caller.data());
            Ok(spawner.spawn(start_arg)?)
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::mailbox;
    use crate::runtime::create_engine;
    use std::thread;

    fn fixture(len: u32, timeout: Duration) -> (Spawner, crate::protocol::Inbox, Arc<WaitSlots>) {
        let engine = create_engine().unwrap();
        let slots = Arc::new(WaitSlots::new(&engine, len).unwrap());
        let namespace = NamespaceId::new("wasm_spawn").unwrap();
        let (outbox, inbox) = mailbox(&namespace, Endpoint::Coordinator);
        let spawner = Spawner::new(namespace, Endpoint::Main, slots.clone(), outbox, timeout);
        (spawner, inbox, slots)
    }

    #[test]
    fn test_spawn_returns_signaled_thread_id() {
        let (spawner, mut inbox, slots) = fixture(8, Duration::from_secs(5));

        let coordinator = thread::spawn(move || {
            let envelope = inbox.recv_blocking().unwrap();
            assert_eq!(envelope.from, Endpoint::Main);
            let Message::CreateThread(request) = envelope.message else {
                panic!("expected CreateThread, got {:?}", envelope.message);
            };
            assert_eq!(request.start_arg, 0x40);
            slots.signal(request.ticket, 9).unwrap();
        });

        assert_eq!(spawner.spawn(0x40).unwrap(), 9);
        coordinator.join().unwrap();
    }

    #[test]
    fn test_negative_completion_is_passed_through() {
        let (spawner, mut inbox, slots) = fixture(8, Duration::from_secs(5));

        let coordinator = thread::spawn(move || {
            if let Some(Message::CreateThread(request)) = inbox.recv_blocking().map(|e| e.message) {
                slots.signal(request.ticket, SPAWN_FAILED).unwrap();
            }
        });

        assert_eq!(spawner.spawn(1).unwrap(), SPAWN_FAILED);
        coordinator.join().unwrap();
    }

    #[test]
    fn test_timeout_returns_negative_and_frees_slot() {
        let (spawner, _inbox, slots) = fixture(2, Duration::from_millis(30));

        assert_eq!(spawner.spawn(1).unwrap(), SPAWN_FAILED);
        // The only slot is usable again.
        assert!(slots.reserve().is_ok());
    }

    #[test]
    fn test_closed_coordinator_returns_negative_and_frees_slot() {
        let (spawner, inbox, slots) = fixture(2, Duration::from_secs(5));
        drop(inbox);

        assert_eq!(spawner.spawn(1).unwrap(), SPAWN_FAILED);
        assert!(slots.reserve().is_ok());
    }

    #[test]
    fn test_exhausted_slots_return_negative() {
        let (spawner, _inbox, slots) = fixture(2, Duration::from_secs(5));
        let _held = slots.reserve().unwrap();

        assert_eq!(spawner.spawn(1).unwrap(), SPAWN_FAILED);
    }
}
