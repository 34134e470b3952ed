//! Perforce changeset automation
//!
//! This crate drives the vendor `p4` command-line client as a subprocess
//! to automate the changeset workflow used by build and release
//! pipelines: sync a workspace, isolate a set of file edits in a named
//! changeset, then submit or discard it.
//!
//! # Design Goals
//!
//! - **Report fully**: every failure carries the command, exit code, and
//!   both captured streams, so problems are diagnosable without a rerun
//! - **No hidden retries**: transient server failures surface to the
//!   caller, who owns the retry decision
//! - **Fakeable boundaries**: the subprocess seam is a trait so tests
//!   never spawn real processes
//!
//! # Example
//!
//! ```no_run
//! use p4::{P4Client, P4Config, SyncOptions};
//!
//! # async fn run() -> Result<(), p4::P4Error> {
//! let config = P4Config::new("builder", "build-ws", "perforce:1666", "p4", "/work/repo");
//! let client = P4Client::new(config)?;
//!
//! client.sync("//depot/project/...", SyncOptions::default()).await?;
//! let changeset = client.create_changeset("Build Test").await?;
//! client.check_out(&changeset, "//depot/project/version.h").await?;
//! client.submit(&changeset).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod executor;
mod process;
mod records;

pub use client::{P4Client, SyncOptions, MANIFEST_FILE_NAME};
pub use config::{P4Config, DEFAULT_RECORD_HELPER};
pub use error::P4Error;
pub use executor::CommandExecutor;
pub use process::{
    CommandOutcome, CommandSpec, ProcessRunner, TokioRunner, DEFAULT_MAX_OUTPUT,
};
pub use records::ChangeRecord;
