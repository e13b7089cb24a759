//! Script interpreter: pre-scan, substitution, assignment, failure modes.

mod common;

use std::fs;
use std::path::PathBuf;

use common::{engine, register_recording};
use kernsh::{script, ScriptError, ShellKind};

fn write_script(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn placeholders_and_variables_substitute_into_the_dispatched_line() {
    let engine = engine();
    let recorder = register_recording(&engine, ShellKind::Main, "probe", vec![]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "items.ksc", "$n = 5\nprobe {0} has $n items\n");

    let session = engine.main_session();
    script::execute_script(&engine, &session, &path, &["Box".to_string()]).unwrap();

    let calls = recorder.invocations();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].raw, "probe Box has 5 items");
    assert_eq!(calls[0].arguments_list, vec!["Box", "has", "5", "items"]);
}

#[test]
fn forward_references_resolve_to_the_empty_string() {
    let engine = engine();
    let recorder = register_recording(&engine, ShellKind::Main, "probe", vec![]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "fwd.ksc", "probe before $x end\n$x = 1\nprobe $x\n");

    let session = engine.main_session();
    script::execute_script(&engine, &session, &path, &[]).unwrap();

    let calls = recorder.invocations();
    assert_eq!(calls.len(), 2);
    // $x existed (empty) before its assignment, so no lookup failure and
    // the token simply vanished.
    assert_eq!(calls[0].arguments_list, vec!["before", "end"]);
    assert_eq!(calls[1].arguments_list, vec!["1"]);
}

#[test]
fn comments_and_blank_lines_never_reach_the_dispatcher() {
    let engine = engine();
    let recorder = register_recording(&engine, ShellKind::Main, "probe", vec![]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(
        &dir,
        "comments.ksc",
        "# a comment\n\n  indented is a comment too\nprobe ran\n",
    );

    let session = engine.main_session();
    script::execute_script(&engine, &session, &path, &[]).unwrap();
    assert_eq!(recorder.invocations().len(), 1);
}

#[test]
fn assignment_values_substitute_before_storing() {
    let engine = engine();
    let recorder = register_recording(&engine, ShellKind::Main, "probe", vec![]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "assign.ksc", "$a = one\n$b = $a {0}\nprobe $b\n");

    let session = engine.main_session();
    script::execute_script(&engine, &session, &path, &["two".to_string()]).unwrap();

    let calls = recorder.invocations();
    assert_eq!(calls[0].arguments_list, vec!["one", "two"]);
}

#[test]
fn capture_feeds_later_lines() {
    let engine = engine();
    let recorder = register_recording(&engine, ShellKind::Main, "probe", vec![]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "capture.ksc", "calc 6 * 7 -> $answer\nprobe $answer\n");

    let session = engine.main_session();
    script::execute_script(&engine, &session, &path, &[]).unwrap();

    let calls = recorder.invocations();
    assert_eq!(calls[0].arguments_list, vec!["42"]);
}

#[test]
fn a_failing_line_aborts_the_rest_of_the_script() {
    let engine = engine();
    let recorder = register_recording(&engine, ShellKind::Main, "probe", vec![]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "broken.ksc", "no_such_command\nprobe never\n");

    let session = engine.main_session();
    let err = script::execute_script(&engine, &session, &path, &[]).unwrap_err();
    match err {
        ScriptError::Malformed { line, message, .. } => {
            assert_eq!(line, 1);
            assert!(message.contains("no_such_command"));
        }
        other => panic!("expected Malformed, got {:?}", other),
    }
    assert!(recorder.invocations().is_empty());
}

#[test]
fn missing_script_file_is_an_io_error() {
    let engine = engine();
    let session = engine.main_session();
    let err =
        script::execute_script(&engine, &session, std::path::Path::new("/nonexistent.ksc"), &[])
            .unwrap_err();
    assert!(matches!(err, ScriptError::Io { .. }));
}

#[test]
fn script_variables_do_not_leak_into_the_calling_session() {
    let engine = engine();
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "leak.ksc", "$secret = 1\n");

    let session = engine.main_session();
    script::execute_script(&engine, &session, &path, &[]).unwrap();
    assert_eq!(session.var("secret"), "");
}

#[test]
fn script_command_runs_scripts_from_the_shell() {
    let engine = engine();
    let recorder = register_recording(&engine, ShellKind::Main, "probe", vec![]);
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(&dir, "nested.ksc", "probe {0}\n");

    let mut session = engine.main_session();
    let line = format!("script {} hello", path.display());
    assert_eq!(engine.run_line(&mut session, &line).unwrap(), 0);
    assert_eq!(recorder.invocations()[0].arguments_list, vec!["hello"]);
}
