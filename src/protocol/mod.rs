// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Roles, messages and routing between the endpoints of a namespace.
//!
//! Every endpoint (the leader, the coordinator, the main worker and each
//! spawned thread) owns one [`Inbox`]. Everything except the wait on a slot
//! is fire-and-forget over ordered unbounded channels.

mod channel;
mod messages;
mod spawn;

pub use channel::{mailbox, Inbox, Outbox, WeakOutbox};
pub use messages::{Endpoint, Envelope, Message, Role, SpawnRequest, ThreadData, ThreadId};
pub use spawn::{add_to_linker, Spawner, SPAWN_FAILED};
