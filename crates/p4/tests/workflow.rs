//! Changeset workflow tests against a fake process runner.
//!
//! No test here spawns a real process: the subprocess boundary is
//! replaced with a scripted responder, and every issued command is
//! recorded for assertions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use p4::{
    CommandExecutor, CommandOutcome, CommandSpec, P4Client, P4Config, P4Error, ProcessRunner,
    SyncOptions, MANIFEST_FILE_NAME,
};

type Responder = Box<dyn Fn(&CommandSpec) -> Result<CommandOutcome, P4Error> + Send + Sync>;

/// Scripted [`ProcessRunner`] that records every spec it is asked to run.
struct FakeRunner {
    calls: Mutex<Vec<CommandSpec>>,
    respond: Responder,
}

impl FakeRunner {
    fn new(
        respond: impl Fn(&CommandSpec) -> Result<CommandOutcome, P4Error> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutcome, P4Error> {
        self.calls.lock().unwrap().push(spec.clone());
        (self.respond)(spec)
    }
}

fn ok(stdout: &str) -> Result<CommandOutcome, P4Error> {
    Ok(CommandOutcome {
        stdout: stdout.to_string(),
        stderr: String::new(),
        code: Some(0),
        success: true,
    })
}

fn failed(code: i32, stdout: &str, stderr: &str) -> Result<CommandOutcome, P4Error> {
    Ok(CommandOutcome {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        code: Some(code),
        success: false,
    })
}

fn test_config() -> P4Config {
    P4Config::new("builder", "build-ws", "perforce:1666", "p4", "/work/repo")
}

fn client_with(runner: Arc<FakeRunner>) -> P4Client {
    P4Client::with_runner(test_config(), runner).unwrap()
}

/// True when the spec is a record query through the helper script.
fn is_record_query(spec: &CommandSpec) -> bool {
    spec.program().to_string_lossy().contains("python")
}

fn is_delete(spec: &CommandSpec) -> bool {
    spec.args().iter().any(|a| a == "-d")
}

#[test]
fn test_missing_config_field_fails_before_any_spawn() {
    let fields: Vec<fn(&mut P4Config)> = vec![
        |c| c.user.clear(),
        |c| c.workspace.clear(),
        |c| c.host.clear(),
        |c| c.exe_path.clear(),
        |c| c.working_directory.clear(),
    ];

    for clear in fields {
        let runner = FakeRunner::new(|_| ok(""));
        let mut config = test_config();
        clear(&mut config);

        let result = P4Client::with_runner(config, runner.clone());
        assert!(matches!(result, Err(P4Error::MissingConfig(_))));
        assert!(runner.calls().is_empty());
    }
}

#[tokio::test]
async fn test_missing_argument_fails_before_any_spawn() {
    let runner = FakeRunner::new(|_| ok(""));
    let client = client_with(runner.clone());

    assert!(matches!(
        client.sync("", SyncOptions::default()).await,
        Err(P4Error::MissingArgument("path"))
    ));
    assert!(matches!(
        client.check_out("", "//depot/file").await,
        Err(P4Error::MissingArgument("changeset id"))
    ));
    assert!(matches!(
        client.create_changeset("").await,
        Err(P4Error::MissingArgument("changeset name"))
    ));

    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_sync_builds_identity_prefixed_command() {
    let runner = FakeRunner::new(|_| ok("//depot/project/... - refreshing\n"));
    let client = client_with(runner.clone());

    client
        .sync("//depot/project/...", SyncOptions { force: true })
        .await
        .unwrap();

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].args(),
        [
            "-u",
            "builder",
            "-c",
            "build-ws",
            "-p",
            "perforce:1666",
            "sync",
            "-f",
            "//depot/project/...",
        ]
    );
}

#[tokio::test]
async fn test_create_changeset_returns_new_identifier() {
    let runner = FakeRunner::new(|_| ok("Change 1234 created.\n"));
    let client = client_with(runner.clone());

    let id = client.create_changeset("Build Test").await.unwrap();
    assert_eq!(id, "1234");

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].stdin_payload(),
        Some("Change: new\nDescription: Build Test\n")
    );
    assert!(calls[0].args().ends_with(&["change".into(), "-i".into()]));
}

#[tokio::test]
async fn test_create_changeset_rejects_unexpected_confirmation() {
    let runner = FakeRunner::new(|_| ok("Unexpected output"));
    let client = client_with(runner);

    match client.create_changeset("Build Test").await {
        Err(err @ P4Error::ChangesetCreateFailed(_)) => {
            assert!(err.to_string().contains("Build Test"));
        }
        other => panic!("expected ChangesetCreateFailed, got {other:?}"),
    }
}

fn two_pending_changesets(spec: &CommandSpec) -> Result<CommandOutcome, P4Error> {
    assert!(is_record_query(spec));
    ok(r#"[
        {"change": "1", "desc": "Build Test A", "status": "pending"},
        {"change": "2", "desc": "Build Test B", "status": "pending"}
    ]"#)
}

#[tokio::test]
async fn test_find_changeset_exact_single_match() {
    let client = client_with(FakeRunner::new(two_pending_changesets));
    assert_eq!(client.find_changeset("Build Test A").await.unwrap(), "1");
}

#[tokio::test]
async fn test_find_changeset_substring_ambiguity() {
    let client = client_with(FakeRunner::new(two_pending_changesets));

    match client.find_changeset("Build Test").await {
        Err(P4Error::AmbiguousChangeset { name, count }) => {
            assert_eq!(name, "Build Test");
            assert_eq!(count, 2);
        }
        other => panic!("expected AmbiguousChangeset, got {other:?}"),
    }
}

#[tokio::test]
async fn test_find_changeset_not_found() {
    let client = client_with(FakeRunner::new(two_pending_changesets));

    match client.find_changeset("Nonexistent").await {
        Err(P4Error::ChangesetNotFound(name)) => assert_eq!(name, "Nonexistent"),
        other => panic!("expected ChangesetNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_record_query_diagnostics_are_a_parse_error() {
    let runner = FakeRunner::new(|_| ok("Perforce password (P4PASSWD) invalid or unset."));
    let client = client_with(runner);

    assert!(matches!(
        client.pending_changesets().await,
        Err(P4Error::RecordParse { .. })
    ));
}

#[tokio::test]
async fn test_delete_empty_changesets_tolerates_open_files() {
    let runner = FakeRunner::new(|spec| {
        if is_record_query(spec) {
            return ok(r#"[
                {"change": "1", "desc": "a", "status": "pending"},
                {"change": "2", "desc": "b", "status": "pending"},
                {"change": "3", "desc": "c", "status": "pending"}
            ]"#);
        }
        assert!(is_delete(spec));
        if spec.args().iter().any(|a| a == "2") {
            failed(
                1,
                "Change 2 has 1 open file(s) associated with it and can't be deleted.\n",
                "",
            )
        } else {
            ok("Change deleted.\n")
        }
    });
    let client = client_with(runner.clone());

    client.delete_empty_changesets().await.unwrap();

    let deletes: Vec<_> = runner.calls().into_iter().filter(|s| is_delete(s)).collect();
    assert_eq!(deletes.len(), 3);
}

#[tokio::test]
async fn test_delete_empty_changesets_twice_is_a_noop() {
    let runner = FakeRunner::new(|spec| {
        assert!(is_record_query(spec));
        ok("[]")
    });
    let client = client_with(runner.clone());

    client.delete_empty_changesets().await.unwrap();
    client.delete_empty_changesets().await.unwrap();

    // Two listing queries, zero delete commands.
    assert_eq!(runner.calls().len(), 2);
}

#[tokio::test]
async fn test_tolerant_policy_returns_failure_payload_verbatim() {
    let runner = FakeRunner::new(|_| failed(1, "partial output", "diagnostic text"));
    let executor = CommandExecutor::new(runner, false);

    let spec = CommandSpec::argv("p4", ["-u", "builder", "edit"], "/work/repo");
    let outcome = executor.run_tolerant(&spec).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.code, Some(1));
    assert_eq!(outcome.stdout, "partial output");
    assert_eq!(outcome.stderr, "diagnostic text");
}

#[tokio::test]
async fn test_strict_policy_preserves_streams_in_error() {
    let runner = FakeRunner::new(|_| failed(7, "out text", "err text"));
    let executor = CommandExecutor::new(runner, false);

    let spec = CommandSpec::argv("p4", ["submit", "-c", "9"], "/work/repo");
    match executor.run(&spec).await {
        Err(P4Error::CommandFailed {
            command,
            code,
            stdout,
            stderr,
        }) => {
            assert_eq!(command, "p4 submit -c 9");
            assert_eq!(code, Some(7));
            assert_eq!(stdout, "out text");
            assert_eq!(stderr, "err text");
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_add_directory_manifest_lists_files_only() {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("source");
    std::fs::create_dir_all(source.join("nested")).unwrap();
    std::fs::write(source.join("a.txt"), "a").unwrap();
    std::fs::write(source.join("b.txt"), "b").unwrap();

    let mut config = test_config();
    config.working_directory = root.path().to_path_buf();

    let runner = FakeRunner::new(|_| ok(""));
    let client = P4Client::with_runner(config, runner.clone()).unwrap();

    client
        .add_directory_to_changeset("42", source.to_str().unwrap(), None)
        .await
        .unwrap();

    let manifest = std::fs::read_to_string(root.path().join(MANIFEST_FILE_NAME)).unwrap();
    let mut lines: Vec<&str> = manifest.lines().collect();
    lines.sort_unstable();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("a.txt"));
    assert!(lines[1].ends_with("b.txt"));

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].cwd(), source);
    assert!(calls[0].args().iter().any(|a| a == "-x"));
    assert!(calls[0]
        .args()
        .iter()
        .any(|a| a.ends_with(MANIFEST_FILE_NAME)));
}

#[tokio::test]
async fn test_revert_unchanged_adds_restricting_flag() {
    let runner = FakeRunner::new(|_| ok(""));
    let client = client_with(runner.clone());

    client.revert_unchanged("//depot/project/...").await.unwrap();
    client.revert_all("//depot/project/...").await.unwrap();

    let calls = runner.calls();
    assert!(calls[0].args().iter().any(|a| a == "-a"));
    assert!(!calls[1].args().iter().any(|a| a == "-a"));
}
