// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Static checks on a [`ThreadsConfig`] before anything is allocated.
//!
//! Checks run in a fixed order and stop at the first failure; each one maps
//! to a single [`ConfigError`] variant so callers can match on the cause.

use crate::config::consts::{MAX_MEMORY_PAGES, MAX_WAIT_SLOTS, MIN_WAIT_SLOTS};
use crate::config::ThreadsConfig;
use crate::errors::ConfigError;

/// Validate a configuration.
///
/// # Errors
/// * [`ConfigError::EmptyNamespace`] for a blank namespace
/// * [`ConfigError::InvalidWaitSlots`] when `wait_slots` is outside `2..=65536`
/// * [`ConfigError::InvalidSpawnTimeout`] for a zero timeout
/// * [`ConfigError::InvalidMemory`] when `initial > maximum` or `maximum` exceeds 4 GiB
pub fn validate_config(cfg: &ThreadsConfig) -> Result<(), ConfigError> {
    if cfg.namespace.as_deref().is_some_and(|ns| ns.trim().is_empty()) {
        return Err(ConfigError::EmptyNamespace);
    }

    if !(MIN_WAIT_SLOTS..=MAX_WAIT_SLOTS).contains(&cfg.wait_slots) {
        return Err(ConfigError::InvalidWaitSlots {
            requested: cfg.wait_slots,
            min: MIN_WAIT_SLOTS,
            max: MAX_WAIT_SLOTS,
        });
    }

    if cfg.spawn_timeout_ms == 0 {
        return Err(ConfigError::InvalidSpawnTimeout);
    }

    if let Some(memory) = cfg.memory {
        if memory.initial > memory.maximum || memory.maximum > MAX_MEMORY_PAGES {
            return Err(ConfigError::InvalidMemory {
                initial: memory.initial,
                maximum: memory.maximum,
            });
        }
    }

    Ok(())
}
