// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::atomics::SlotTicket;
use crate::lifecycle::ExitStatus;
use crate::namespace::{NamespaceId, SharedResources};
use crate::protocol::Outbox;
use std::fmt;
use std::sync::Arc;

/// Role a worker plays inside its namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Runs `_start` of the module.
    Main,
    /// Owns the child list and services spawn requests. Runs no WASM.
    Coordinator,
    /// Runs the thread entry export for one spawned thread.
    ThreadWorker,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Main => "wasi_main",
            Role::Coordinator => "wasi_coordinator",
            Role::ThreadWorker => "wasi_worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Positive id of a spawned thread, as returned by `thread-spawn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(u32);

impl ThreadId {
    /// Largest id `wasi-threads` allows.
    pub const MAX: u32 = 0x1FFF_FFFF;

    /// `None` for `0` and for ids above [`ThreadId::MAX`].
    pub fn new(id: u32) -> Option<Self> {
        (1..=Self::MAX).contains(&id).then_some(Self(id))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The id as the guest sees it. Always positive.
    pub fn as_i32(self) -> i32 {
        self.0 as i32
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address of an inbox inside a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The host side that created the namespace.
    Leader,
    Coordinator,
    Main,
    Thread(ThreadId),
}

impl Endpoint {
    /// Role of the worker behind this endpoint; the leader has none.
    pub fn role(&self) -> Option<Role> {
        match self {
            Endpoint::Leader => None,
            Endpoint::Coordinator => Some(Role::Coordinator),
            Endpoint::Main => Some(Role::Main),
            Endpoint::Thread(_) => Some(Role::ThreadWorker),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Leader => f.write_str("leader"),
            Endpoint::Coordinator => f.write_str("coordinator"),
            Endpoint::Main => f.write_str("main"),
            Endpoint::Thread(id) => write!(f, "thread-{id}"),
        }
    }
}

/// A message together with its namespace and sender.
#[derive(Debug)]
pub struct Envelope {
    pub namespace: NamespaceId,
    pub from: Endpoint,
    pub message: Message,
}

/// Everything that travels between endpoints.
pub enum Message {
    /// Coordinator (or leader) to a fresh worker: what to run.
    InitThreadData(Box<ThreadData>),
    /// Coordinator to leader: the dispatch loop is listening.
    CoordinatorReady,
    /// Running instance to coordinator: start a thread.
    CreateThread(SpawnRequest),
    /// Worker to its parent: instantiated against the shared memory.
    ThreadReady,
    /// Stop listening and release the namespace.
    Destroy,
    /// Worker to its parent: the worker thread is ending.
    Exited(ExitStatus),
}

impl Message {
    pub fn name(&self) -> &'static str {
        match self {
            Message::InitThreadData(_) => "InitThreadData",
            Message::CoordinatorReady => "CoordinatorReady",
            Message::CreateThread(_) => "CreateThread",
            Message::ThreadReady => "ThreadReady",
            Message::Destroy => "Destroy",
            Message::Exited(_) => "Exited",
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::CreateThread(request) => f.debug_tuple("CreateThread").field(request).finish(),
            Message::Exited(status) => f.debug_tuple("Exited").field(status).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Payload of [`Message::InitThreadData`].
pub struct ThreadData {
    pub role: Role,
    pub resources: Arc<SharedResources>,
    /// Set for spawned threads, `None` for the main worker.
    pub thread_id: Option<ThreadId>,
    pub start_arg: i32,
    /// Where `thread-spawn` sends `CreateThread`.
    pub coordinator: Outbox,
    /// Where the worker reports `ThreadReady` and `Exited`.
    pub parent: Outbox,
}

/// Payload of [`Message::CreateThread`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Guest pointer handed to the thread entry.
    pub start_arg: i32,
    /// Slot the caller is blocked on.
    pub ticket: SlotTicket,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names() {
        assert_eq!(Role::Main.to_string(), "wasi_main");
        assert_eq!(Role::Coordinator.to_string(), "wasi_coordinator");
        assert_eq!(Role::ThreadWorker.to_string(), "wasi_worker");
    }

    #[test]
    fn test_thread_id_range() {
        assert!(ThreadId::new(0).is_none());
        assert!(ThreadId::new(ThreadId::MAX + 1).is_none());
        assert_eq!(ThreadId::new(1).map(ThreadId::as_i32), Some(1));
        assert!(ThreadId::new(ThreadId::MAX).is_some_and(|id| id.as_i32() > 0));
    }

    #[test]
    fn test_endpoint_display_and_role() {
        let thread = Endpoint::Thread(ThreadId::new(7).unwrap());
        assert_eq!(thread.to_string(), "thread-7");
        assert_eq!(thread.role(), Some(Role::ThreadWorker));
        assert_eq!(Endpoint::Leader.role(), None);
        assert_eq!(Endpoint::Coordinator.role(), Some(Role::Coordinator));
    }
}
