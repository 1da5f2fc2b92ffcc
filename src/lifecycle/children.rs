// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::atomics::SlotTicket;
use crate::errors::ProtocolError;
use crate::lifecycle::{Lifecycle, WorkerState};
use crate::protocol::{Endpoint, Message, Outbox, ThreadId};
use std::collections::BTreeMap;
use std::thread::JoinHandle;

/// The coordinator's view of one spawned thread.
///
/// The coordinator only sees two of the worker's transitions: `ThreadReady`
/// (instantiated and ready) and `Exited`.
pub struct WorkerHandle {
    endpoint: Endpoint,
    ticket: Option<SlotTicket>,
    lifecycle: Lifecycle,
    outbox: Outbox,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn new(
        endpoint: Endpoint,
        ticket: Option<SlotTicket>,
        outbox: Outbox,
        join: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            endpoint,
            ticket,
            lifecycle: Lifecycle::new(endpoint.to_string()),
            outbox,
            join,
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    /// Record readiness and hand back the ticket to signal, if any.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidTransition`] for a repeated `ThreadReady` or
    /// one arriving after the worker exited.
    pub fn mark_ready(&mut self) -> Result<Option<SlotTicket>, ProtocolError> {
        self.lifecycle.advance(WorkerState::Instantiated)?;
        self.lifecycle.advance(WorkerState::Ready)?;
        Ok(self.ticket.take())
    }

    pub fn mark_exited(&mut self) -> Result<(), ProtocolError> {
        self.lifecycle.advance(WorkerState::Exited)
    }

    pub fn send(&self, from: Endpoint, message: Message) -> bool {
        self.outbox.send(from, message).is_ok()
    }

    /// Wait for the worker's OS thread to finish.
    pub fn join(mut self) {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::warn!(worker = %self.endpoint, "worker thread panicked outside guest code");
            }
        }
    }
}

/// Children of a coordinator keyed by thread id.
#[derive(Default)]
pub struct ChildSet {
    children: BTreeMap<ThreadId, WorkerHandle>,
}

impl ChildSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ThreadId, handle: WorkerHandle) {
        self.children.insert(id, handle);
    }

    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut WorkerHandle> {
        self.children.get_mut(&id)
    }

    pub fn remove(&mut self, id: ThreadId) -> Option<WorkerHandle> {
        self.children.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Send one `Destroy` to every child; returns how many were delivered.
    pub fn broadcast_destroy(&self, from: Endpoint) -> usize {
        self.children
            .values()
            .filter(|child| child.send(from, Message::Destroy))
            .count()
    }

    /// Forget every child without joining.
    pub fn clear(&mut self) {
        self.children.clear();
    }
}
