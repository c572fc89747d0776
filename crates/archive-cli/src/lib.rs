//! Archive command-line tools: ingest, the worker process and housekeeping.

pub mod commands;
pub mod telemetry;

pub use telemetry::init_tracing;

use anyhow::Context;
use serde::Serialize;

/// Pretty-print a command result on stdout.
pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize command output")?;
    println!("{}", out);
    Ok(())
}
