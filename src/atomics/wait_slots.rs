// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lock-free wait slot allocator over a shared `i32` array.
//!
//! The array lives in a wasmtime [`SharedMemory`] so that blocking uses the
//! engine's OS-level `memory.atomic.wait32` / `memory.atomic.notify`
//! primitives instead of spinning. Slot 0 is the rolling reservation cursor;
//! every other slot holds one of:
//!
//! * `0` - free
//! * `i32::MIN` - reserved, a caller is (or is about to be) waiting
//! * anything else - the completion value
//!
//! Each slot also owns a host-side ticket word `generation << 2 | state`.
//! A waiter that gives up and a signaler that completes race for the ticket,
//! so a completion for a request that already timed out can never land in a
//! slot that was handed to somebody else in the meantime.

use crate::config::consts::{MAX_WAIT_SLOTS, MIN_WAIT_SLOTS};
use crate::errors::{ConfigError, ProtocolError, ThreadsResult};
use crate::observability::messages::slots::{SlotWaitTimedOut, SlotsExhausted, StaleSignalDiscarded};
use crate::observability::messages::StructuredLog;
use crate::runtime::RuntimeError;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use wasmtime::{Engine, MemoryType, SharedMemory, WaitResult};

/// Value of a free slot.
pub const FREE: i32 = 0;
/// Value of a reserved slot that has not been completed yet.
pub const RESERVED: i32 = i32::MIN;

const CURSOR: u32 = 0;
const CELL_BYTES: u64 = 4;
const WASM_PAGE_BYTES: u64 = 64 * 1024;

const TICKET_DEAD: u64 = 0;
const TICKET_LIVE: u64 = 1;
const TICKET_SIGNALING: u64 = 2;
const TICKET_STATE_MASK: u64 = 0b11;

/// Proof of a reservation, handed to `wait`, `release` and `signal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTicket {
    index: u32,
    generation: u32,
}

impl SlotTicket {
    /// Index of the reserved slot inside the array.
    pub fn index(&self) -> u32 {
        self.index
    }

    fn word(&self, state: u64) -> u64 {
        (u64::from(self.generation) << 2) | state
    }
}

/// Why a `wait` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The slot was signaled with this value.
    Completed(i32),
    /// Nobody signaled before the timeout.
    TimedOut,
}

/// Fixed-length array of wait slots shared by every worker of a namespace.
pub struct WaitSlots {
    memory: SharedMemory,
    len: u32,
    tickets: Box<[AtomicU64]>,
}

impl WaitSlots {
    /// Allocate an array of `len` cells (cursor included) in a fresh shared memory.
    pub fn new(engine: &Engine, len: u32) -> ThreadsResult<Self> {
        if !(MIN_WAIT_SLOTS..=MAX_WAIT_SLOTS).contains(&len) {
            return Err(ConfigError::InvalidWaitSlots {
                requested: len,
                min: MIN_WAIT_SLOTS,
                max: MAX_WAIT_SLOTS,
            }
            .into());
        }

        let pages = (u64::from(len) * CELL_BYTES).div_ceil(WASM_PAGE_BYTES) as u32;
        let memory = SharedMemory::new(engine, MemoryType::shared(pages, pages))
            .map_err(|e| RuntimeError::MemoryError(format!("wait slot memory: {e}")))?;

        let tickets = (0..len).map(|_| AtomicU64::new(TICKET_DEAD)).collect();
        let slots = Self { memory, len, tickets };
        slots.cell(CURSOR).store(1, Ordering::SeqCst);
        Ok(slots)
    }

    /// Number of cells, including the cursor cell.
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Number of slots usable for waiting.
    pub fn capacity(&self) -> u32 {
        self.len - 1
    }

    /// Current raw value of a slot.
    pub fn load(&self, index: u32) -> Result<i32, ProtocolError> {
        self.check_index(index)?;
        Ok(self.cell(index).load(Ordering::SeqCst))
    }

    /// Reserve a free slot.
    ///
    /// Advances the rolling cursor and claims the first free candidate with a
    /// compare-and-swap. Gives up with [`ProtocolError::SlotsExhausted`] after
    /// two full passes over the array instead of spinning forever.
    pub fn reserve(&self) -> Result<SlotTicket, ProtocolError> {
        let cursor = self.cell(CURSOR);
        let limit = u64::from(self.len) * 2;
        let mut attempts = 0u64;

        loop {
            let candidate = cursor.fetch_add(1, Ordering::SeqCst);
            if candidate < 1 || candidate as u32 > self.len - 1 {
                // Only the caller holding the latest cursor value resets it, so a
                // concurrent increment is never clobbered.
                let _ = cursor.compare_exchange(
                    candidate.wrapping_add(1),
                    1,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                );
                continue;
            }

            let index = candidate as u32;
            if self
                .cell(index)
                .compare_exchange(FREE, RESERVED, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Ok(self.arm(index));
            }

            attempts += 1;
            if attempts >= limit {
                SlotsExhausted { capacity: self.capacity() }.log();
                return Err(ProtocolError::SlotsExhausted {
                    capacity: self.capacity(),
                });
            }
        }
    }

    /// Give a reservation back without waiting for it.
    ///
    /// If a signal is already in flight the call lets it land first, then frees
    /// the slot.
    pub fn release(&self, ticket: SlotTicket) -> Result<(), ProtocolError> {
        self.wait(ticket, Duration::ZERO).map(|_| ())
    }

    /// Block until the slot is signaled or `timeout` elapses.
    ///
    /// The slot is released on every return path; release is the waiter's job.
    pub fn wait(&self, ticket: SlotTicket, timeout: Duration) -> Result<WaitOutcome, ProtocolError> {
        self.check_index(ticket.index)?;
        if !self.holds(ticket) {
            return Err(ProtocolError::WaitOnUnreserved { index: ticket.index });
        }

        let cell = self.cell(ticket.index);
        let mut deadline = Some(Instant::now() + timeout);

        loop {
            let value = cell.load(Ordering::SeqCst);
            if value == FREE {
                return Err(ProtocolError::WaitOnUnreserved { index: ticket.index });
            }
            if value != RESERVED {
                self.free(ticket);
                return Ok(WaitOutcome::Completed(value));
            }

            let remaining = match deadline {
                Some(at) => {
                    let now = Instant::now();
                    if now >= at {
                        if self.claim(ticket, TICKET_DEAD) {
                            cell.store(FREE, Ordering::SeqCst);
                            if !timeout.is_zero() {
                                SlotWaitTimedOut { index: ticket.index, timeout }.log();
                            }
                            return Ok(WaitOutcome::TimedOut);
                        }
                        // A signaler owns the ticket; its value is about to land.
                        deadline = None;
                        None
                    } else {
                        Some(at - now)
                    }
                }
                None => None,
            };

            self.memory
                .atomic_wait32(self.address(ticket.index), RESERVED as u32, remaining)
                .map(|_: WaitResult| ())
                .map_err(|trap| ProtocolError::AtomicTrap {
                    index: ticket.index,
                    reason: trap.to_string(),
                })?;
        }
    }

    /// Complete a reservation with `value` and wake its waiter.
    ///
    /// Returns `Ok(false)` when the reservation is no longer live (its waiter
    /// timed out); the value is discarded in that case.
    pub fn signal(&self, ticket: SlotTicket, value: i32) -> Result<bool, ProtocolError> {
        if value == FREE || value == RESERVED {
            return Err(ProtocolError::ReservedValue(value));
        }
        self.check_index(ticket.index)?;

        if !self.claim(ticket, TICKET_SIGNALING) {
            StaleSignalDiscarded { index: ticket.index, value }.log();
            return Ok(false);
        }

        let cell = self.cell(ticket.index);
        if cell
            .compare_exchange(RESERVED, value, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            StaleSignalDiscarded { index: ticket.index, value }.log();
            return Ok(false);
        }

        self.memory
            .atomic_notify(self.address(ticket.index), 1)
            .map_err(|trap| ProtocolError::AtomicTrap {
                index: ticket.index,
                reason: trap.to_string(),
            })?;
        Ok(true)
    }

    fn arm(&self, index: u32) -> SlotTicket {
        let previous = self.tickets[index as usize].load(Ordering::SeqCst);
        let ticket = SlotTicket {
            index,
            generation: ((previous >> 2) as u32).wrapping_add(1),
        };
        self.tickets[index as usize].store(ticket.word(TICKET_LIVE), Ordering::SeqCst);
        ticket
    }

    fn holds(&self, ticket: SlotTicket) -> bool {
        let word = self.tickets[ticket.index as usize].load(Ordering::SeqCst);
        word == ticket.word(TICKET_LIVE) || word == ticket.word(TICKET_SIGNALING)
    }

    /// Move a live ticket into `state`. Exactly one of waiter and signaler wins.
    fn claim(&self, ticket: SlotTicket, state: u64) -> bool {
        self.tickets[ticket.index as usize]
            .compare_exchange(
                ticket.word(TICKET_LIVE),
                ticket.word(state),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    fn free(&self, ticket: SlotTicket) {
        debug_assert_ne!(
            self.tickets[ticket.index as usize].load(Ordering::SeqCst) & TICKET_STATE_MASK,
            TICKET_DEAD
        );
        self.tickets[ticket.index as usize].store(ticket.word(TICKET_DEAD), Ordering::SeqCst);
        self.cell(ticket.index).store(FREE, Ordering::SeqCst);
    }

    fn check_index(&self, index: u32) -> Result<(), ProtocolError> {
        if index == CURSOR || index >= self.len {
            return Err(ProtocolError::SlotOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(())
    }

    fn address(&self, index: u32) -> u64 {
        u64::from(index) * CELL_BYTES
    }

    fn cell(&self, index: u32) -> &AtomicI32 {
        let byte = &self.memory.data()[index as usize * CELL_BYTES as usize];
        // SAFETY: the shared memory is page aligned and never shrinks, `index`
        // is below `len` so the four bytes are in bounds and 4-byte aligned, and
        // every access to the array goes through atomics.
        unsafe { AtomicI32::from_ptr(byte.get().cast::<i32>()) }
    }
}
