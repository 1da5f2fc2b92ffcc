// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{ProtocolError, ThreadsResult};
use crate::lifecycle::{ExitStatus, Lifecycle, WorkerState};
use crate::namespace::NamespaceId;
use crate::observability::messages::lifecycle::{DispatchFailed, WorkerCancelled, WorkerStarted};
use crate::observability::messages::StructuredLog;
use crate::protocol::{mailbox, Endpoint, Inbox, Message, Outbox, Role, Spawner, ThreadData};
use crate::runtime::WorkerInstance;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

/// Start an idle worker thread for `endpoint`.
///
/// The worker waits for `InitThreadData`, instantiates the module against the
/// shared memory, reports `ThreadReady` to its parent and runs guest code.
/// When the thread ends, however it ends, the parent receives `Exited`.
pub fn spawn_worker(
    namespace: &NamespaceId,
    endpoint: Endpoint,
) -> io::Result<(Outbox, JoinHandle<()>)> {
    let (outbox, inbox) = mailbox(namespace, endpoint);
    let join = thread::Builder::new()
        .name(format!("{namespace}.{endpoint}"))
        .spawn(move || run_worker(inbox))?;
    Ok((outbox, join))
}

fn run_worker(mut inbox: Inbox) {
    let endpoint = inbox.owner();
    let namespace = inbox.namespace().clone();
    let role = endpoint.role().unwrap_or(Role::ThreadWorker);

    let data = loop {
        let Some(envelope) = inbox.recv_blocking() else {
            return;
        };
        match envelope.message {
            Message::InitThreadData(data) => break data,
            Message::Destroy => {
                WorkerCancelled {
                    namespace: namespace.as_str(),
                    worker: endpoint,
                }
                .log();
                return;
            }
            other => DispatchFailed {
                namespace: namespace.as_str(),
                role,
                error: &ProtocolError::UnexpectedMessage {
                    role,
                    message: other.name(),
                },
            }
            .log(),
        }
    };

    let parent = data.parent.clone();
    let status = match panic::catch_unwind(AssertUnwindSafe(|| execute(&namespace, endpoint, &data))) {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => ExitStatus::failed(e),
        Err(payload) => ExitStatus::Panicked(panic_message(payload.as_ref())),
    };
    drop(data);

    if parent.send(endpoint, Message::Exited(status)).is_err() {
        tracing::debug!(
            namespace = namespace.as_str(),
            worker = %endpoint,
            "parent stopped before exit notice"
        );
    }

    // A Destroy that arrived while guest code ran needs no further action.
    while inbox.try_recv().is_some() {}
}

fn execute(namespace: &NamespaceId, endpoint: Endpoint, data: &ThreadData) -> ThreadsResult<ExitStatus> {
    let resources = &data.resources;
    let settings = &resources.settings;
    let thread_id = match (data.role, data.thread_id) {
        (Role::Main, _) => None,
        (Role::ThreadWorker, Some(id)) => Some(id),
        (role, _) => {
            return Err(ProtocolError::UnexpectedMessage {
                role,
                message: "InitThreadData",
            }
            .into())
        }
    };

    let mut lifecycle = Lifecycle::new(endpoint.to_string());
    let spawner = Spawner::new(
        namespace.clone(),
        endpoint,
        resources.slots.clone(),
        data.coordinator.clone(),
        settings.spawn_timeout,
    );
    let mut instance = WorkerInstance::instantiate(resources, namespace, data.role, spawner)?;
    lifecycle.advance(WorkerState::Instantiated)?;

    data.parent.send(endpoint, Message::ThreadReady)?;
    lifecycle.advance(WorkerState::Ready)?;

    let started = WorkerStarted {
        namespace: namespace.as_str(),
        worker: endpoint,
        role: instance.role(),
    };
    started.log();
    let _span = started.span("guest").entered();
    lifecycle.advance(WorkerState::Running)?;

    let status = match thread_id {
        Some(id) => instance.run_thread(&settings.thread_entry, id, data.start_arg),
        None => instance.run_main(settings.init_method.as_deref()),
    };
    lifecycle.advance(WorkerState::Exited)?;
    Ok(status)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
