use thiserror::Error;

/// Errors that can occur while driving the p4 client
#[derive(Debug, Error)]
pub enum P4Error {
    #[error("required config field not set: {0}")]
    MissingConfig(&'static str),

    #[error("required argument not supplied: {0}")]
    MissingArgument(&'static str),

    #[error("command failed with exit code {code:?}: {command}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("command output exceeded the {limit} byte capture buffer")]
    OutputOverflow { limit: usize },

    #[error("could not parse record output: {source}")]
    RecordParse {
        #[source]
        source: serde_json::Error,
        output: String,
    },

    #[error("failed to create changeset '{0}'")]
    ChangesetCreateFailed(String),

    #[error("no pending changeset matches name '{0}'")]
    ChangesetNotFound(String),

    #[error("{count} pending changesets match name '{name}'")]
    AmbiguousChangeset { name: String, count: usize },

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
