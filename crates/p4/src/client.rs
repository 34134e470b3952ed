//! Perforce changeset workflow.
//!
//! [`P4Client`] drives the vendor `p4` command-line client as a
//! subprocess to automate the changeset lifecycle used by build
//! pipelines: sync a workspace, create a named changeset, check files
//! out into it, then either submit it or revert and delete it. The
//! server is the sole authority on changeset state; nothing is cached
//! across calls and no changeset-level locking is done here, so
//! concurrent automation runs against the same workspace must be
//! serialized by the caller.

use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use crate::config::P4Config;
use crate::error::P4Error;
use crate::executor::CommandExecutor;
use crate::process::{CommandSpec, ProcessRunner, TokioRunner};
use crate::records::{query_records, ChangeRecord};

/// Name of the file-list manifest written by
/// [`P4Client::add_directory_to_changeset`]. Reserved within the
/// configured working directory; the file persists after the call.
pub const MANIFEST_FILE_NAME: &str = "files.txt";

/// Glob pattern appended to the directory when none is supplied.
const DEFAULT_GLOB_PATTERN: &str = "/**/*";

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Options for [`P4Client::sync`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Force-sync (`p4 sync -f`), overwriting local modifications
    /// unconditionally. Destructive; be careful with this.
    pub force: bool,
}

/// Client for one Perforce user/workspace/server triple.
pub struct P4Client {
    config: P4Config,
    executor: CommandExecutor,
}

impl P4Client {
    /// Validate the configuration and build a client backed by real
    /// subprocesses.
    pub fn new(config: P4Config) -> Result<Self, P4Error> {
        Self::with_runner(config, Arc::new(TokioRunner::new()))
    }

    /// Like [`new`](Self::new), with the subprocess boundary
    /// substituted. Used by tests to avoid spawning real processes.
    pub fn with_runner(
        config: P4Config,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self, P4Error> {
        config.validate()?;
        let executor = CommandExecutor::new(runner, config.verbose);
        Ok(Self { config, executor })
    }

    pub fn config(&self) -> &P4Config {
        &self.config
    }

    /// Get latest files for a path (`p4 sync`).
    pub async fn sync(&self, path: &str, options: SyncOptions) -> Result<(), P4Error> {
        require_arg(path, "path")?;

        let mut args = self.identity_args();
        args.push("sync".into());
        if options.force {
            args.push("-f".into());
        }
        args.push(path.into());

        self.executor.run(&self.p4_spec(args)).await?;
        Ok(())
    }

    /// Create a new changeset with the given description and return the
    /// server-assigned identifier.
    pub async fn create_changeset(&self, name: &str) -> Result<String, P4Error> {
        require_arg(name, "changeset name")?;

        let change_spec = format!("Change: new\nDescription: {name}\n");

        let mut args = self.identity_args();
        args.push("change".into());
        args.push("-i".into());

        let spec = self.p4_spec(args).stdin(change_spec);
        let output = self.executor.run(&spec).await?;

        parse_created_change(&output)
            .ok_or_else(|| P4Error::ChangesetCreateFailed(name.to_string()))
    }

    /// List this user/workspace's pending changesets with full
    /// descriptions.
    pub async fn pending_changesets(&self) -> Result<Vec<ChangeRecord>, P4Error> {
        let mut args = self.identity_args();
        for arg in [
            "changes",
            "-u",
            &self.config.user,
            "-c",
            &self.config.workspace,
            "-s",
            "pending",
            "-l",
        ] {
            args.push(arg.to_string());
        }

        query_records(&self.executor, &self.config, &args).await
    }

    /// Find the identifier of the pending changeset whose description
    /// contains `name`.
    ///
    /// Matching is case-sensitive substring containment, so a name that
    /// is a prefix of another will match both; exactly one match is
    /// required. Choose more specific names rather than relying on
    /// truncation.
    pub async fn find_changeset(&self, name: &str) -> Result<String, P4Error> {
        require_arg(name, "changeset name")?;

        let records = self.pending_changesets().await?;
        let matches: Vec<&ChangeRecord> =
            records.iter().filter(|r| r.desc.contains(name)).collect();

        match matches.as_slice() {
            [] => Err(P4Error::ChangesetNotFound(name.to_string())),
            [only] => Ok(only.change.clone()),
            _ => Err(P4Error::AmbiguousChangeset {
                name: name.to_string(),
                count: matches.len(),
            }),
        }
    }

    /// Check out files under `path` into the changeset (`p4 edit`).
    pub async fn check_out(&self, changeset_id: &str, path: &str) -> Result<(), P4Error> {
        require_arg(changeset_id, "changeset id")?;
        require_arg(path, "path")?;

        let mut args = self.identity_args();
        for arg in ["edit", "-c", changeset_id, path] {
            args.push(arg.to_string());
        }

        self.executor.run(&self.p4_spec(args)).await?;
        Ok(())
    }

    /// Add every file under `directory` matching `pattern` (default
    /// `/**/*`, files only) to the changeset.
    ///
    /// The matching paths are written one per line to the
    /// [`MANIFEST_FILE_NAME`] manifest in the configured working
    /// directory, then `p4 -x <manifest> add` runs with `directory` as
    /// its working directory. The manifest is left on disk afterwards.
    pub async fn add_directory_to_changeset(
        &self,
        changeset_id: &str,
        directory: &str,
        pattern: Option<&str>,
    ) -> Result<(), P4Error> {
        require_arg(changeset_id, "changeset id")?;
        require_arg(directory, "directory")?;

        let pattern = pattern.unwrap_or(DEFAULT_GLOB_PATTERN);

        let mut files = Vec::new();
        for entry in glob::glob(&format!("{directory}{pattern}"))? {
            let path = entry.map_err(glob::GlobError::into_error)?;
            if path.is_file() {
                files.push(path.display().to_string());
            }
        }

        let manifest = self.config.working_directory.join(MANIFEST_FILE_NAME);
        tokio::fs::write(&manifest, files.join(LINE_ENDING)).await?;

        let mut args = self.identity_args();
        args.push("-x".into());
        args.push(manifest.display().to_string());
        args.push("add".into());
        args.push("-c".into());
        args.push(changeset_id.into());

        let spec = CommandSpec::argv(&self.config.exe_path, args, directory);
        self.executor.run(&spec).await?;
        Ok(())
    }

    /// Revert all checked-out files under `path`.
    pub async fn revert_all(&self, path: &str) -> Result<(), P4Error> {
        self.revert(path, false).await
    }

    /// Revert only files with no content difference versus the server
    /// baseline (`p4 revert -a`), preserving genuinely modified files.
    pub async fn revert_unchanged(&self, path: &str) -> Result<(), P4Error> {
        self.revert(path, true).await
    }

    /// Delete a changeset with no checked-out files (`p4 change -d`).
    /// The server rejects the delete if files are still open; that
    /// failure is surfaced rather than pre-checked.
    pub async fn delete_empty_changeset(&self, changeset_id: &str) -> Result<(), P4Error> {
        require_arg(changeset_id, "changeset id")?;

        self.executor
            .run(&self.p4_spec(self.delete_args(changeset_id)))
            .await?;
        Ok(())
    }

    /// Delete every empty pending changeset owned by this
    /// user/workspace.
    ///
    /// One delete command per listed changeset is launched concurrently;
    /// a changeset the server refuses to delete (still has open files)
    /// is logged and skipped. A no-op when nothing is pending, and safe
    /// to call repeatedly.
    pub async fn delete_empty_changesets(&self) -> Result<(), P4Error> {
        let records = self.pending_changesets().await?;

        let deletes = records
            .iter()
            .map(|record| self.delete_tolerating_open_files(&record.change));

        for result in join_all(deletes).await {
            result?;
        }
        Ok(())
    }

    /// Submit the changeset's checked-out files to the server. On
    /// success the identifier is no longer valid for further
    /// operations.
    pub async fn submit(&self, changeset_id: &str) -> Result<(), P4Error> {
        require_arg(changeset_id, "changeset id")?;

        let mut args = self.identity_args();
        for arg in ["submit", "-c", changeset_id] {
            args.push(arg.to_string());
        }

        self.executor.run(&self.p4_spec(args)).await?;
        Ok(())
    }

    async fn revert(&self, path: &str, unchanged_only: bool) -> Result<(), P4Error> {
        require_arg(path, "path")?;

        let mut args = self.identity_args();
        args.push("revert".into());
        if unchanged_only {
            args.push("-a".into());
        }
        args.push(path.into());

        self.executor.run(&self.p4_spec(args)).await?;
        Ok(())
    }

    async fn delete_tolerating_open_files(&self, changeset_id: &str) -> Result<(), P4Error> {
        let outcome = self
            .executor
            .run_tolerant(&self.p4_spec(self.delete_args(changeset_id)))
            .await?;

        if !outcome.success {
            let diagnostic = if outcome.stdout.trim().is_empty() {
                outcome.stderr.trim()
            } else {
                outcome.stdout.trim()
            };
            warn!(changeset = changeset_id, "Not deleted: {diagnostic}");
        }
        Ok(())
    }

    fn delete_args(&self, changeset_id: &str) -> Vec<String> {
        let mut args = self.identity_args();
        for arg in ["change", "-d", changeset_id] {
            args.push(arg.to_string());
        }
        args
    }

    /// Identity flags every p4 invocation starts with.
    fn identity_args(&self) -> Vec<String> {
        vec![
            "-u".into(),
            self.config.user.clone(),
            "-c".into(),
            self.config.workspace.clone(),
            "-p".into(),
            self.config.host.clone(),
        ]
    }

    fn p4_spec(&self, args: Vec<String>) -> CommandSpec {
        CommandSpec::argv(&self.config.exe_path, args, &self.config.working_directory)
    }
}

fn require_arg(value: &str, name: &'static str) -> Result<(), P4Error> {
    if value.is_empty() {
        Err(P4Error::MissingArgument(name))
    } else {
        Ok(())
    }
}

/// Extract the new identifier from the `p4 change -i` confirmation
/// text, expected to contain a `Change <number> created` line.
///
/// This is the one place that depends on the vendor's exact wording.
fn parse_created_change(output: &str) -> Option<String> {
    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("Change") {
            continue;
        }
        let id = match tokens.next() {
            Some(t) if !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()) => t,
            _ => continue,
        };
        if tokens.next().is_some_and(|t| t.starts_with("created")) {
            return Some(id.to_string());
        }
    }
    None
}
