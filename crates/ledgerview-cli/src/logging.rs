// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! `tracing` subscriber setup. The TUI owns the terminal, so interactive
//! runs log to a file; `--check` logs to stderr.

use anyhow::{Context, Result, anyhow};
use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: [&str; 5] = [
    "ledgerview",
    "ledgerview_app",
    "ledgerview_client",
    "ledgerview_testkit",
    "ledgerview_tui",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// `-v` raises the configured level: one for debug, two or more for trace.
pub fn resolve_level(verbosity: u8, configured: &str) -> Result<Level> {
    match verbosity {
        0 => Level::from_str(configured)
            .map_err(|_| anyhow!("invalid log level {configured:?}")),
        1 => Ok(Level::DEBUG),
        _ => Ok(Level::TRACE),
    }
}

pub fn init_logging(level: Level, target: &LogTarget) -> Result<()> {
    let filter = build_env_filter(level);
    let registry = tracing_subscriber::registry().with(filter);
    match target {
        LogTarget::Stderr => registry
            .with(fmt::layer().with_writer(io::stderr).with_target(false))
            .try_init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            registry
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                )
                .try_init()
        }
    }
    .map_err(|error| anyhow!("install log subscriber: {error}"))
}

/// `RUST_LOG` wins when set; otherwise our crates log at `level` and
/// everything else stays at warn.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    let mut directives = vec!["warn".to_owned()];
    directives.extend(CRATES.iter().map(|name| format!("{name}={level}")));
    directives.join(",")
}
