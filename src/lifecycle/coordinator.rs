// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The coordinator: a WASM-free worker that owns the child list of a
//! namespace and services every spawn request.
//!
//! The main instance can not service messages while its guest code runs (or
//! while it is itself blocked in `thread-spawn`), so spawning is always
//! delegated to this dedicated dispatch loop.

use crate::errors::ProtocolError;
use crate::lifecycle::{spawn_worker, ChildSet, ExitStatus, WorkerHandle};
use crate::namespace::{NamespaceId, SharedResources};
use crate::observability::messages::lifecycle::{CoordinatorStopped, DispatchFailed, WorkerExited};
use crate::observability::messages::spawn::SpawnFailed;
use crate::observability::messages::StructuredLog;
use crate::protocol::{
    mailbox, Endpoint, Envelope, Inbox, Message, Outbox, Role, SpawnRequest, ThreadData, ThreadId,
    WeakOutbox, SPAWN_FAILED,
};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Start the coordinator thread of `namespace`.
///
/// The coordinator posts `CoordinatorReady` to `leader` before it starts
/// listening.
pub fn spawn_coordinator(
    namespace: NamespaceId,
    resources: Arc<SharedResources>,
    leader: Outbox,
) -> io::Result<(Outbox, JoinHandle<()>)> {
    let (outbox, inbox) = mailbox(&namespace, Endpoint::Coordinator);
    let coordinator = Coordinator::new(namespace.clone(), resources, inbox, outbox.downgrade());

    let join = thread::Builder::new()
        .name(format!("{namespace}.coordinator"))
        .spawn(move || {
            if leader
                .send(Endpoint::Coordinator, Message::CoordinatorReady)
                .is_ok()
            {
                drop(leader);
                coordinator.run();
            }
        })?;

    Ok((outbox, join))
}

enum Flow {
    Continue,
    Stop(usize),
}

pub struct Coordinator {
    namespace: NamespaceId,
    resources: Arc<SharedResources>,
    inbox: Inbox,
    outbox: WeakOutbox,
    children: ChildSet,
    next_id: u32,
}

impl Coordinator {
    pub fn new(
        namespace: NamespaceId,
        resources: Arc<SharedResources>,
        inbox: Inbox,
        outbox: WeakOutbox,
    ) -> Self {
        Self {
            namespace,
            resources,
            inbox,
            outbox,
            children: ChildSet::new(),
            next_id: 1,
        }
    }

    /// Register a child that was started elsewhere.
    pub fn adopt(&mut self, id: ThreadId, handle: WorkerHandle) {
        self.children.insert(id, handle);
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Dispatch until `Destroy` arrives or every outbox is gone.
    ///
    /// Returns the number of children that were sent `Destroy`.
    pub fn run(mut self) -> usize {
        let mut notified = 0;
        while let Some(envelope) = self.inbox.recv_blocking() {
            match self.dispatch(envelope) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop(count)) => {
                    notified = count;
                    break;
                }
                Err(e) => DispatchFailed {
                    namespace: self.namespace.as_str(),
                    role: Role::Coordinator,
                    error: &e,
                }
                .log(),
            }
        }

        CoordinatorStopped {
            namespace: self.namespace.as_str(),
            notified,
        }
        .log();
        notified
    }

    fn dispatch(&mut self, envelope: Envelope) -> Result<Flow, ProtocolError> {
        match (envelope.message, envelope.from) {
            (Message::CreateThread(request), _) => {
                self.create_thread(request);
                Ok(Flow::Continue)
            }
            (Message::ThreadReady, Endpoint::Thread(id)) => {
                self.thread_ready(id)?;
                Ok(Flow::Continue)
            }
            (Message::Exited(status), Endpoint::Thread(id)) => {
                self.thread_exited(id, status)?;
                Ok(Flow::Continue)
            }
            (Message::Destroy, _) => {
                let notified = self.children.broadcast_destroy(Endpoint::Coordinator);
                // Children may still be running guest code; they are not joined.
                self.children.clear();
                Ok(Flow::Stop(notified))
            }
            (message, _) => Err(ProtocolError::UnexpectedMessage {
                role: Role::Coordinator,
                message: message.name(),
            }),
        }
    }

    fn next_thread_id(&mut self) -> Option<ThreadId> {
        let id = ThreadId::new(self.next_id)?;
        self.next_id += 1;
        Some(id)
    }

    fn create_thread(&mut self, request: SpawnRequest) {
        let Some(id) = self.next_thread_id() else {
            return self.reject(request, "thread ids exhausted");
        };
        let Some(coordinator) = self.outbox.upgrade() else {
            return self.reject(request, "coordinator is shutting down");
        };

        let endpoint = Endpoint::Thread(id);
        let (outbox, join) = match spawn_worker(&self.namespace, endpoint) {
            Ok(worker) => worker,
            Err(e) => return self.reject(request, &e.to_string()),
        };

        let data = ThreadData {
            role: Role::ThreadWorker,
            resources: self.resources.clone(),
            thread_id: Some(id),
            start_arg: request.start_arg,
            coordinator: coordinator.clone(),
            parent: coordinator,
        };
        if let Err(e) = outbox.send(Endpoint::Coordinator, Message::InitThreadData(Box::new(data))) {
            return self.reject(request, &e.to_string());
        }

        let handle = WorkerHandle::new(endpoint, Some(request.ticket), outbox, Some(join));
        self.children.insert(id, handle);
    }

    fn reject(&self, request: SpawnRequest, reason: &str) {
        SpawnFailed {
            namespace: self.namespace.as_str(),
            start_arg: request.start_arg,
            code: SPAWN_FAILED,
            reason,
        }
        .log();
        if let Err(e) = self.resources.slots.signal(request.ticket, SPAWN_FAILED) {
            DispatchFailed {
                namespace: self.namespace.as_str(),
                role: Role::Coordinator,
                error: &e,
            }
            .log();
        }
    }

    fn thread_ready(&mut self, id: ThreadId) -> Result<(), ProtocolError> {
        let child = self
            .children
            .get_mut(id)
            .ok_or(ProtocolError::UnexpectedMessage {
                role: Role::Coordinator,
                message: "ThreadReady",
            })?;
        if let Some(ticket) = child.mark_ready()? {
            // `false` means the caller already gave up; the thread keeps running.
            self.resources.slots.signal(ticket, id.as_i32())?;
        }
        Ok(())
    }

    fn thread_exited(&mut self, id: ThreadId, status: ExitStatus) -> Result<(), ProtocolError> {
        let Some(mut child) = self.children.remove(id) else {
            return Ok(());
        };
        WorkerExited {
            namespace: self.namespace.as_str(),
            worker: child.endpoint(),
            status: &status,
        }
        .log();
        let transition = child.mark_exited();
        child.join();
        transition
    }
}
