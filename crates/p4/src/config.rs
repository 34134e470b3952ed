use std::path::PathBuf;

use crate::error::P4Error;

/// Default name of the helper script that converts p4 output to JSON.
/// Resolved relative to the working directory unless overridden.
pub const DEFAULT_RECORD_HELPER: &str = "p4_to_json.py";

/// Connection and location parameters for a Perforce client session.
///
/// The five identity/location fields (`user`, `workspace`, `host`,
/// `exe_path`, `working_directory`) are mandatory; [`P4Client::new`]
/// refuses to construct when any of them is empty, so no command is
/// ever issued with a partial identity.
///
/// [`P4Client::new`]: crate::P4Client::new
#[derive(Debug, Clone)]
pub struct P4Config {
    /// Perforce user name (`-u`)
    pub user: String,
    /// Client workspace name (`-c`)
    pub workspace: String,
    /// Server host, e.g. `perforce:1666` (`-p`)
    pub host: String,
    /// Path to the p4 executable
    pub exe_path: PathBuf,
    /// Directory commands run in unless an operation overrides it
    pub working_directory: PathBuf,
    /// Path to the output-to-JSON helper script used by listing queries
    pub record_helper: PathBuf,
    /// Dump captured stdout/stderr of every command to the trace log
    pub verbose: bool,
}

impl P4Config {
    pub fn new(
        user: impl Into<String>,
        workspace: impl Into<String>,
        host: impl Into<String>,
        exe_path: impl Into<PathBuf>,
        working_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            user: user.into(),
            workspace: workspace.into(),
            host: host.into(),
            exe_path: exe_path.into(),
            working_directory: working_directory.into(),
            record_helper: PathBuf::from(DEFAULT_RECORD_HELPER),
            verbose: false,
        }
    }

    /// Check that every mandatory field is present before any command runs
    pub(crate) fn validate(&self) -> Result<(), P4Error> {
        if self.user.is_empty() {
            return Err(P4Error::MissingConfig("user"));
        }
        if self.workspace.is_empty() {
            return Err(P4Error::MissingConfig("workspace"));
        }
        if self.host.is_empty() {
            return Err(P4Error::MissingConfig("host"));
        }
        if self.exe_path.as_os_str().is_empty() {
            return Err(P4Error::MissingConfig("exe_path"));
        }
        if self.working_directory.as_os_str().is_empty() {
            return Err(P4Error::MissingConfig("working_directory"));
        }
        Ok(())
    }
}
