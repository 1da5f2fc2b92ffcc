// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod validation;

pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, MemorySetting, Preopen, ThreadsConfig, WasiOptions,
};
pub use validation::validate_config;
