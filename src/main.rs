// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::process;
use tracing_subscriber::EnvFilter;
use wasi_worker_threads::config::load_and_validate_config;
use wasi_worker_threads::errors::ThreadsResult;
use wasi_worker_threads::pool::ThreadPool;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <config.yaml|config.toml>", args[0]);
        eprintln!("Example: {} threads.yaml", args[0]);
        process::exit(2);
    }

    match run(&args[1]).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Failed to run {}: {}", args[1], e);
            process::exit(1);
        }
    }
}

/// Launch the namespace described by `config_file` and wait for its main worker.
async fn run(config_file: &str) -> ThreadsResult<i32> {
    let config = load_and_validate_config(config_file)?;
    let pool = ThreadPool::new()?;

    let mut handle = pool.launch(config).await?;
    let status = handle.wait().await?;
    eprintln!("{}: main {}", handle.namespace(), status);

    handle.destroy().await?;
    Ok(status.code())
}
