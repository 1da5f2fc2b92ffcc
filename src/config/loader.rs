// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_MEMORY_INITIAL_PAGES, DEFAULT_MEMORY_MAXIMUM_PAGES, DEFAULT_SPAWN_TIMEOUT_MS,
    DEFAULT_THREAD_ENTRY, DEFAULT_WAIT_SLOTS,
};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration of one threaded namespace.
///
/// Typically loaded from a YAML or TOML file; every field has a default so a
/// file only needs to name the module.
///
/// # Example
/// ```yaml
/// namespace: image_pipeline
/// module: build/pipeline.wasm
/// init_method: main2
/// wait_slots: 1024
/// spawn_timeout_ms: 1000
/// wasi:
///   args: ["pipeline", "--fast"]
///   env:
///     RUST_LOG: debug
///   inherit_stdio: true
///   preopens:
///     - host: ./data
///       guest: /data
/// memory:
///   initial: 512
///   maximum: 4096
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadsConfig {
    /// Namespace identifier; generated as `wasm_<base36>` when absent.
    #[serde(default)]
    pub namespace: Option<String>,

    /// Path of the module to run. The launcher may also be handed bytes or a
    /// compiled module directly.
    #[serde(default)]
    pub module: Option<PathBuf>,

    /// Extra export to call on the main instance after `_start`.
    #[serde(default)]
    pub init_method: Option<String>,

    /// Declarative WASI setup. Set to `null` when every worker's hook supplies
    /// its own WASI context.
    #[serde(default = "default_wasi")]
    pub wasi: Option<WasiOptions>,

    /// Shared linear memory limits; the module's declared import is used when absent.
    #[serde(default)]
    pub memory: Option<MemorySetting>,

    /// Cells in the wait slot array, cursor included.
    #[serde(default = "default_wait_slots")]
    pub wait_slots: u32,

    /// How long `thread-spawn` waits for the new thread.
    #[serde(default = "default_spawn_timeout_ms")]
    pub spawn_timeout_ms: u64,

    /// Export run by spawned threads.
    #[serde(default = "default_thread_entry")]
    pub thread_entry: String,

    /// Skip `_start` on the main instance.
    #[serde(default)]
    pub no_wasi_start: bool,
}

impl Default for ThreadsConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            module: None,
            init_method: None,
            wasi: default_wasi(),
            memory: None,
            wait_slots: DEFAULT_WAIT_SLOTS,
            spawn_timeout_ms: DEFAULT_SPAWN_TIMEOUT_MS,
            thread_entry: DEFAULT_THREAD_ENTRY.to_string(),
            no_wasi_start: false,
        }
    }
}

impl ThreadsConfig {
    /// Configuration for the module at `path` with every other field defaulted.
    pub fn for_module<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            module: Some(path.into()),
            ..Self::default()
        }
    }

    /// Spawn timeout as a `Duration`.
    pub fn spawn_timeout(&self) -> Duration {
        Duration::from_millis(self.spawn_timeout_ms)
    }
}

/// WASI preview1 context options applied to every worker.
#[derive(Debug, Clone, Deserialize)]
pub struct WasiOptions {
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub inherit_stdio: bool,
    #[serde(default)]
    pub preopens: Vec<Preopen>,
}

impl Default for WasiOptions {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            env: BTreeMap::new(),
            inherit_stdio: true,
            preopens: Vec::new(),
        }
    }
}

/// A host directory made visible to the guest.
#[derive(Debug, Clone, Deserialize)]
pub struct Preopen {
    pub host: PathBuf,
    pub guest: String,
}

/// Shared linear memory limits in 64 KiB pages.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct MemorySetting {
    #[serde(default = "default_memory_initial")]
    pub initial: u32,
    #[serde(default = "default_memory_maximum")]
    pub maximum: u32,
}

impl Default for MemorySetting {
    fn default() -> Self {
        Self {
            initial: DEFAULT_MEMORY_INITIAL_PAGES,
            maximum: DEFAULT_MEMORY_MAXIMUM_PAGES,
        }
    }
}

fn default_wasi() -> Option<WasiOptions> {
    Some(WasiOptions::default())
}

fn default_true() -> bool {
    true
}

fn default_wait_slots() -> u32 {
    DEFAULT_WAIT_SLOTS
}

fn default_spawn_timeout_ms() -> u64 {
    DEFAULT_SPAWN_TIMEOUT_MS
}

fn default_thread_entry() -> String {
    DEFAULT_THREAD_ENTRY.to_string()
}

fn default_memory_initial() -> u32 {
    DEFAULT_MEMORY_INITIAL_PAGES
}

fn default_memory_maximum() -> u32 {
    DEFAULT_MEMORY_MAXIMUM_PAGES
}

/// Load a config from a YAML (`.yaml`/`.yml`) or TOML (`.toml`) file.
///
/// Relative `module` paths are resolved against the directory of the file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ThreadsConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: display.clone(),
        source,
    })?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let mut cfg: ThreadsConfig = if is_toml {
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: display.clone(),
            reason: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: display.clone(),
            reason: e.to_string(),
        })?
    };

    if let (Some(module), Some(dir)) = (cfg.module.as_ref(), path.parent()) {
        if module.is_relative() {
            cfg.module = Some(dir.join(module));
        }
    }

    Ok(cfg)
}

/// Load a config file and run [`validate_config`](crate::config::validate_config) on it.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<ThreadsConfig, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg)?;
    Ok(cfg)
}
