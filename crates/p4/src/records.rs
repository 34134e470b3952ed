//! Structured record queries.
//!
//! Some p4 sub-commands are queried through a helper script that
//! re-runs them with machine-readable output enabled and prints the
//! result as one JSON array on stdout. This module builds that command
//! line, runs it through the executor, and parses the stdout into
//! [`ChangeRecord`]s. A command that exits zero but emits unparseable
//! text (the helper's own diagnostics, say) fails with
//! [`P4Error::RecordParse`], distinct from a command failure.

use serde::{Deserialize, Serialize};

use crate::config::P4Config;
use crate::error::P4Error;
use crate::executor::CommandExecutor;
use crate::process::CommandSpec;

/// One row of a changeset listing query. `change` and `desc` are the
/// fields the workflow actively reads; everything else the server
/// returned is kept as-is in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Server-assigned changeset identifier
    pub change: String,
    /// Full description text
    #[serde(default)]
    pub desc: String,
    /// Changeset status as reported by the server, e.g. `pending`
    #[serde(default)]
    pub status: Option<String>,
    /// Remaining server-supplied fields, untouched
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Run a p4 query through the record helper and parse the resulting
/// JSON document.
pub(crate) async fn query_records(
    executor: &CommandExecutor,
    config: &P4Config,
    p4_args: &[String],
) -> Result<Vec<ChangeRecord>, P4Error> {
    // The helper takes the whole p4 argument string as one argument.
    let spec = CommandSpec::argv(
        "python",
        [config.record_helper.display().to_string(), p4_args.join(" ")],
        &config.working_directory,
    );

    let stdout = executor.run(&spec).await?;
    parse_records(&stdout)
}

/// Parse helper stdout as a sequence of records.
pub(crate) fn parse_records(stdout: &str) -> Result<Vec<ChangeRecord>, P4Error> {
    serde_json::from_str(stdout).map_err(|source| P4Error::RecordParse {
        source,
        output: stdout.to_string(),
    })
}
