// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::{ProtocolError, ThreadsError, ThreadsResult};
use crate::lifecycle::ExitStatus;
use crate::namespace::{CoordinationRecord, NamespaceId, NamespaceRegistry};
use crate::observability::messages::lifecycle::WorkerExited;
use crate::observability::messages::StructuredLog;
use crate::pool::destroy_record;
use crate::protocol::{Endpoint, Envelope, Inbox, Message};
use std::sync::Arc;
use std::thread::JoinHandle;
use wasmtime::SharedMemory;

/// A launched namespace, held by the leader.
///
/// Dropping the handle destroys the namespace unless that already happened.
pub struct NamespaceHandle {
    registry: Arc<NamespaceRegistry>,
    record: Arc<CoordinationRecord>,
    inbox: Inbox,
    main: Option<JoinHandle<()>>,
    coordinator: Option<JoinHandle<()>>,
    status: Option<ExitStatus>,
    destroyed: bool,
}

impl NamespaceHandle {
    pub(crate) fn new(
        registry: Arc<NamespaceRegistry>,
        record: Arc<CoordinationRecord>,
        inbox: Inbox,
        main: JoinHandle<()>,
        coordinator: JoinHandle<()>,
    ) -> Self {
        Self {
            registry,
            record,
            inbox,
            main: Some(main),
            coordinator: Some(coordinator),
            status: None,
            destroyed: false,
        }
    }

    pub fn namespace(&self) -> &NamespaceId {
        self.record.namespace()
    }

    /// The linear memory every worker of the namespace shares.
    pub fn memory(&self) -> Option<&SharedMemory> {
        self.record.resources().map(|resources| &resources.memory)
    }

    /// Wait for the main instance to finish `_start` and the init method.
    ///
    /// Spawned threads may still be running afterwards; they stop with
    /// [`NamespaceHandle::destroy`] only once their guest code returns.
    pub async fn wait(&mut self) -> ThreadsResult<ExitStatus> {
        if let Some(status) = &self.status {
            return Ok(status.clone());
        }

        loop {
            match self.inbox.recv().await {
                Some(Envelope {
                    from: Endpoint::Main,
                    message: Message::Exited(status),
                    ..
                }) => {
                    WorkerExited {
                        namespace: self.record.namespace().as_str(),
                        worker: Endpoint::Main,
                        status: &status,
                    }
                    .log();
                    if let Some(join) = self.main.take() {
                        // The worker only drains its inbox after the exit notice.
                        let _ = tokio::task::spawn_blocking(move || join.join()).await;
                    }
                    self.status = Some(status.clone());
                    return Ok(status);
                }
                Some(envelope) => tracing::debug!(
                    namespace = self.record.namespace().as_str(),
                    from = %envelope.from,
                    message = envelope.message.name(),
                    "leader ignored message"
                ),
                None => {
                    return Err(ThreadsError::WorkerLost {
                        worker: Endpoint::Main.to_string(),
                        reason: "exit notice never arrived".to_string(),
                    })
                }
            }
        }
    }

    /// Unregister the namespace and stop its coordinator.
    ///
    /// The registry entry is gone when this returns, so the id can be launched
    /// again right away, even before the returned future finishes joining
    /// the coordinator thread. Returns how many endpoints were told to stop.
    pub async fn destroy(mut self) -> Result<usize, ProtocolError> {
        self.destroyed = true;
        let notified = destroy_record(&self.registry, &self.record)?;
        if let Some(join) = self.coordinator.take() {
            let _ = tokio::task::spawn_blocking(move || join.join()).await;
        }
        Ok(notified)
    }
}

impl Drop for NamespaceHandle {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        match destroy_record(&self.registry, &self.record) {
            Ok(_) | Err(ProtocolError::UnknownNamespace(_)) => {}
            Err(e) => tracing::warn!(
                namespace = self.record.namespace().as_str(),
                error = %e,
                "failed to destroy namespace on drop"
            ),
        }
    }
}
