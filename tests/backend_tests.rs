//! Tests for the execution backends
//!
//! These tests verify:
//! - Mock backend call accounting (counts, zero-indexed args, unknown keys)
//! - Dry-run backend making no changes while reporting success
//! - Live backend exit-code-as-data semantics and the checked variants
//! - Streaming consumption of a real child process's output

use std::path::Path;

use hpcforge::{
    BackendKind, DryRunBackend, EngineError, ExecutionBackend, LiveBackend, MockBackend,
    OsIdentity, ScriptBuilder, StreamRead, SPAWN_FAILURE_EXIT_CODE,
};

// =============================================================================
// Mock Backend Accounting
// =============================================================================

#[test]
fn test_mock_counts_exactly_one_call() {
    let backend = MockBackend::new();
    backend.execute_command("dnf -y install foo").unwrap();
    assert_eq!(backend.call_count("dnf -y install foo"), 1);
    assert_eq!(backend.last_call().as_deref(), Some("dnf -y install foo"));

    backend.execute_command("dnf -y install foo").unwrap();
    assert_eq!(backend.call_count("dnf -y install foo"), 2);
}

#[test]
fn test_mock_unknown_queries_never_fail() {
    let backend = MockBackend::new();
    assert_eq!(backend.call_count("never-called"), 0);
    assert!(backend.call_args("never-called", 0).is_empty());
    assert!(backend.call_args("never-called", 99).is_empty());
}

#[test]
fn test_mock_parameterized_calls() {
    let backend = MockBackend::new();
    backend.record_call("UnitEnable", &["munge.service", "runtime"]);
    backend.record_call("UnitEnable", &["slurmd.service", "persistent"]);

    assert_eq!(backend.call_count("UnitEnable"), 2);
    assert_eq!(backend.call_args("UnitEnable", 0), vec!["munge.service", "runtime"]);
    assert_eq!(
        backend.call_args("UnitEnable", 1),
        vec!["slurmd.service", "persistent"]
    );
}

#[test]
fn test_mock_script_execution_records_commands_in_order() {
    let mut script = ScriptBuilder::new(OsIdentity::default()).unwrap();
    script.add_package("slurm").enable_service("slurmd");

    let backend = MockBackend::new();
    let result = backend.execute_script(&script).unwrap();
    assert!(result.success());
    assert_eq!(result.backend_kind, BackendKind::Mock);
    assert_eq!(backend.call_count("dnf install -y slurm"), 1);
    assert_eq!(backend.last_call().as_deref(), Some("systemctl enable --now slurmd"));
}

#[test]
fn test_mock_streaming_replays_canned_output() {
    let backend = MockBackend::new();
    backend.set_output("sinfo", &["PARTITION AVAIL", "compute up"]);
    let mut stream = backend.execute_command_iter("sinfo").unwrap();
    assert_eq!(stream.getline(), StreamRead::Data("PARTITION AVAIL\n".into()));
    assert_eq!(stream.getline(), StreamRead::Data("compute up\n".into()));
    assert_eq!(stream.getline(), StreamRead::Closed);
}

// =============================================================================
// Dry-Run Backend
// =============================================================================

#[test]
fn test_dry_run_never_touches_the_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("marker");
    let backend = DryRunBackend::new();

    let exit = backend
        .execute_command(&format!("touch {}", marker.display()))
        .unwrap();
    assert_eq!(exit, 0);
    assert!(!marker.exists(), "dry-run must not execute commands");
}

#[test]
fn test_dry_run_download_reports_success() {
    let backend = DryRunBackend::new();
    let exit = backend
        .download_file("https://example.com/x.rpm", Path::new("/tmp/x.rpm"))
        .unwrap();
    assert_eq!(exit, 0);
    assert!(!Path::new("/tmp/x.rpm").exists());
}

#[test]
fn test_dry_run_script_reports_success_with_no_output() {
    let mut script = ScriptBuilder::new(OsIdentity::default()).unwrap();
    script.add_package("slurm");
    let result = DryRunBackend::new().execute_script(&script).unwrap();
    assert!(result.success());
    assert!(result.captured_lines.is_empty());
    assert_eq!(result.backend_kind, BackendKind::DryRun);
}

// =============================================================================
// Live Backend
// =============================================================================

#[test]
fn test_live_exit_code_is_data_not_error() {
    let backend = LiveBackend::new();
    assert_eq!(backend.execute_command("true").unwrap(), 0);
    assert_eq!(backend.execute_command("exit 3").unwrap(), 3);
}

#[test]
fn test_live_checked_command_propagates_failure() {
    let backend = LiveBackend::new();
    backend.check_command("true").unwrap();
    let err = backend.check_command("exit 2").unwrap_err();
    match err {
        EngineError::CommandFailed { exit_code, .. } => assert_eq!(exit_code, 2),
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[test]
fn test_live_check_output_ordered_lines() {
    let backend = LiveBackend::new();
    let lines = backend.check_output("printf 'one\\ntwo\\nthree\\n'").unwrap();
    assert_eq!(lines, vec!["one", "two", "three"]);
}

#[test]
fn test_live_download_failure_is_nonzero_exit() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("nothing.rpm");
    let backend = LiveBackend::new();
    // Unresolvable host: curl fails, exit code comes back as data.
    let exit = backend
        .download_file("http://invalid.invalid/x.rpm", &dest)
        .unwrap();
    assert_ne!(exit, 0);
}

#[test]
fn test_live_script_execution_captures_output() {
    let mut script = ScriptBuilder::new(OsIdentity::default()).unwrap();
    script.add_command("echo converged");
    let result = LiveBackend::new().execute_script(&script).unwrap();
    assert!(result.success());
    assert_eq!(result.backend_kind, BackendKind::Live);
    assert_eq!(result.captured_lines, vec!["converged"]);
}

#[test]
fn test_live_script_aborts_on_first_error() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("after-failure");
    let mut script = ScriptBuilder::new(OsIdentity::default()).unwrap();
    script.add_command("false");
    script.add_command(format!("touch {}", marker.display()));

    let result = LiveBackend::new().execute_script(&script).unwrap();
    assert!(!result.success());
    assert!(!marker.exists(), "-e must stop the script at the first failure");
}

// =============================================================================
// Live Streaming
// =============================================================================

#[test]
fn test_live_stream_getline_until_closed() {
    let backend = LiveBackend::new();
    let mut stream = backend
        .execute_command_iter("printf 'alpha\\nbeta\\n'")
        .unwrap();

    let mut lines = Vec::new();
    loop {
        match stream.getline() {
            StreamRead::Data(line) => lines.push(line),
            StreamRead::Pending => continue,
            StreamRead::Closed => break,
        }
    }
    assert_eq!(lines, vec!["alpha\n", "beta\n"]);
    assert_eq!(stream.wait().unwrap(), 0);
}

#[test]
fn test_live_stream_pending_while_child_sleeps() {
    let backend = LiveBackend::new();
    let mut stream = backend
        .execute_command_iter("sleep 0.3; echo done")
        .unwrap();

    // The child produces nothing for a while: pulls report Pending, not Closed.
    let mut saw_pending = false;
    let line = loop {
        match stream.getline() {
            StreamRead::Pending => saw_pending = true,
            StreamRead::Data(line) => break line,
            StreamRead::Closed => panic!("stream closed before producing output"),
        }
    };
    assert!(saw_pending, "expected at least one Pending pull");
    assert_eq!(line, "done\n");
    assert_eq!(stream.wait().unwrap(), 0);
}

#[test]
fn test_live_stream_get_until_delimiter() {
    let backend = LiveBackend::new();
    let mut stream = backend
        .execute_command_iter("printf 'a:b:tail'")
        .unwrap();

    let mut chunks = Vec::new();
    loop {
        match stream.get_until(':') {
            StreamRead::Data(chunk) => chunks.push(chunk),
            StreamRead::Pending => continue,
            StreamRead::Closed => break,
        }
    }
    // The unterminated tail is flushed once the stream closes.
    assert_eq!(chunks, vec!["a:", "b:", "tail"]);
}

#[test]
fn test_live_stream_nonzero_exit_via_wait() {
    let backend = LiveBackend::new();
    let mut stream = backend.execute_command_iter("echo partial; exit 5").unwrap();
    loop {
        match stream.getline() {
            StreamRead::Closed => break,
            _ => continue,
        }
    }
    assert_eq!(stream.wait().unwrap(), 5);
}

#[test]
fn test_live_spawn_failure_uses_sentinel() {
    // `bash -c` itself reports 127 for an unknown command; the sentinel and
    // the shell convention agree here.
    let backend = LiveBackend::new();
    let exit = backend
        .execute_command("definitely-not-a-command-on-any-node")
        .unwrap();
    assert_eq!(exit, SPAWN_FAILURE_EXIT_CODE);
}
