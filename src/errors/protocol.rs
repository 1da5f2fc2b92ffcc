// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::lifecycle::WorkerState;
use crate::protocol::Role;
use thiserror::Error;

/// Violations of the coordination protocol.
///
/// Every variant indicates a bug in the caller or in the coordination logic;
/// none of them is retried or silently dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// `0` and `i32::MIN` mark free and reserved slots and can not be signaled.
    #[error("code {0} is reserved")]
    ReservedValue(i32),

    /// `wait` was called on a slot that the caller does not hold.
    #[error("invalid waiting call on slot {index}: slot is not reserved")]
    WaitOnUnreserved { index: u32 },

    /// Slot index outside the array, or the cursor slot.
    #[error("slot index {index} is outside 1..{len}")]
    SlotOutOfRange { index: u32, len: u32 },

    /// Every slot stayed occupied for a full pass of the cursor.
    #[error("cannot get a waiting index: all {capacity} wait slots are in use")]
    SlotsExhausted { capacity: u32 },

    /// The shared memory rejected an atomic access.
    #[error("atomic access to slot {index} trapped: {reason}")]
    AtomicTrap { index: u32, reason: String },

    /// `destroy` on a namespace without a registry entry.
    #[error("Namespace {0} not found")]
    UnknownNamespace(String),

    /// A worker attempted a lifecycle transition the state machine forbids.
    #[error("worker {worker}: invalid lifecycle transition {from} -> {to}")]
    InvalidTransition {
        worker: String,
        from: WorkerState,
        to: WorkerState,
    },

    /// A role received a message it has no handler for.
    #[error("{role} received unexpected message '{message}'")]
    UnexpectedMessage { role: Role, message: &'static str },

    /// The peer endpoint's inbox is gone.
    #[error("inbox of {endpoint} is closed")]
    ChannelClosed { endpoint: String },
}
