//! Session stack: nested shells, bail semantics, cancellation scoping.

mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use common::{engine, register_recording_unified, ExecError, VecSource};
use kernsh::{
    CommandExecutor, CommandInfo, CommandParameters, ExecContext, LoopExit, ShellKind,
    ShellRegistration, ShellSession,
};

/// Launcher that enters the "lab" custom shell.
struct LabLauncher;

impl CommandExecutor for LabLauncher {
    fn execute(
        &self,
        _params: &CommandParameters,
        ctx: &mut ExecContext<'_>,
    ) -> Result<i32, ExecError> {
        let kind = ShellKind::Custom("lab".to_string());
        match ctx.engine.enter_shell(&kind, "", &mut *ctx.input) {
            Ok(LoopExit::Shutdown) => {
                ctx.session.request_shutdown();
                Ok(0)
            }
            Ok(LoopExit::Popped) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

/// Blocks on the session's cancel gate for a long time.
struct BlockingExecutor;

impl CommandExecutor for BlockingExecutor {
    fn execute(
        &self,
        _params: &CommandParameters,
        ctx: &mut ExecContext<'_>,
    ) -> Result<i32, ExecError> {
        ctx.session.cancel.sleep(Duration::from_secs(5))?;
        Ok(0)
    }
}

fn lab_factory(_arg: &str) -> ShellSession {
    ShellSession::new(ShellKind::Custom("lab".to_string()))
}

fn install_lab_shell(engine: &kernsh::ShellEngine) {
    engine
        .register_shell(ShellRegistration::new(
            ShellKind::Custom("lab".to_string()),
            "lab> ",
            Arc::new(lab_factory),
            vec![CommandInfo::new(
                "block",
                "block until interrupted",
                vec![],
                Arc::new(BlockingExecutor),
            )],
        ))
        .expect("register lab shell");
    engine
        .registry_mut()
        .register(
            ShellKind::Main,
            CommandInfo::new("lab", "enter the lab shell", vec![], Arc::new(LabLauncher)),
        )
        .expect("register lab launcher");
}

#[test]
fn sub_shell_pops_back_to_a_live_parent() {
    let engine = engine();
    install_lab_shell(&engine);
    let recorder = register_recording_unified(&engine, "probe", vec![]);

    let mut session = engine.main_session();
    let mut input = VecSource::new(&["lab", "probe inside", "exit", "probe outside", "exit"]);
    let exit = engine.run_session(&mut session, &mut input);

    // The bottom session bailed, so the loop reports shutdown.
    assert_eq!(exit, LoopExit::Shutdown);

    let calls = recorder.invocations();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].arguments_list, vec!["inside"]);
    assert_eq!(calls[1].arguments_list, vec!["outside"]);
}

#[test]
fn eof_in_a_sub_shell_only_pops_that_shell() {
    let engine = engine();
    install_lab_shell(&engine);
    let recorder = register_recording_unified(&engine, "probe", vec![]);

    // The source runs dry inside the lab shell; the main loop then sees
    // Eof as well and exits. Only the lab shell's absence of "probe after"
    // distinguishes the two pops, so record what ran.
    let mut session = engine.main_session();
    let mut input = VecSource::new(&["lab", "probe inside"]);
    let exit = engine.run_session(&mut session, &mut input);

    assert_eq!(exit, LoopExit::Shutdown);
    assert_eq!(recorder.invocations().len(), 1);
}

#[test]
fn cancellation_aborts_only_the_current_sub_shell_command() {
    let engine = Arc::new(engine());
    install_lab_shell(&engine);
    let recorder = register_recording_unified(&engine, "probe", vec![]);

    // Signal the innermost session's gate while `block` is sleeping in
    // the lab shell.
    let interrupter = {
        let engine = Arc::clone(&engine);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            engine.interrupt();
        })
    };

    let mut session = engine.main_session();
    let mut input = VecSource::new(&[
        "lab",
        "block",
        "probe sub-alive",
        "exit",
        "probe parent-alive",
        "exit",
    ]);
    let exit = engine.run_session(&mut session, &mut input);
    interrupter.join().expect("interrupter thread");

    assert_eq!(exit, LoopExit::Shutdown);

    // The blocked command aborted, the lab shell kept running, and the
    // parent session was untouched.
    let calls = recorder.invocations();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].arguments_list, vec!["sub-alive"]);
    assert_eq!(calls[1].arguments_list, vec!["parent-alive"]);
    assert!(!session.cancel.is_signaled());
}

#[test]
fn empty_input_shuts_the_bottom_session_down() {
    let engine = engine();
    let mut session = engine.main_session();
    let mut input = VecSource::new(&[]);
    assert_eq!(engine.run_session(&mut session, &mut input), LoopExit::Shutdown);
}

#[test]
fn json_sub_shell_edits_a_document_end_to_end() {
    let engine = engine();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{\"name\": \"old\"}").unwrap();
    let path_str = path.to_str().unwrap().to_string();

    let enter = format!("json {}", path_str);
    let mut session = engine.main_session();
    let mut input = VecSource::new(&[enter.as_str(), "set /name new", "save", "exit", "exit"]);
    let exit = engine.run_session(&mut session, &mut input);
    assert_eq!(exit, LoopExit::Shutdown);

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["name"], "new");
}
