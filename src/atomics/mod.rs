// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod wait_slots;

pub use wait_slots::{SlotTicket, WaitOutcome, WaitSlots, FREE, RESERVED};
