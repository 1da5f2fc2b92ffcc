// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Worker lifecycles: the coordinator thread, worker threads, and the state
//! machine each worker walks through.
//!
//! ```text
//! Created -> Instantiated -> Ready -> Running -> Exited
//!    \___________\______________\________\______/
//! ```
//!
//! Every live state may jump to `Exited`; the parent always learns how a
//! worker ended through an `Exited` message.

mod children;
mod coordinator;
mod state;
mod worker;

pub use children::{ChildSet, WorkerHandle};
pub use coordinator::{spawn_coordinator, Coordinator};
pub use state::{ExitStatus, Lifecycle, WorkerState};
pub use worker::spawn_worker;
