//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use kernsh::{
    builtins, ArgumentShape, CommandExecutor, CommandInfo, CommandParameters, ExecContext,
    LineSource, ReadOutcome, ShellEngine, ShellKind, ShellSession,
};

pub type ExecError = Box<dyn std::error::Error + Send + Sync>;

/// Engine with the builtin tables installed.
pub fn engine() -> ShellEngine {
    let engine = ShellEngine::new();
    builtins::install(&engine).expect("builtins install");
    engine
}

/// Line source over a fixed list of lines; Eof afterwards.
pub struct VecSource {
    lines: std::vec::IntoIter<String>,
}

impl VecSource {
    pub fn new(lines: &[&str]) -> Self {
        VecSource {
            lines: lines
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .into_iter(),
        }
    }
}

impl LineSource for VecSource {
    fn read_line(&mut self, _session: &ShellSession) -> ReadOutcome {
        match self.lines.next() {
            Some(line) => ReadOutcome::Line(line),
            None => ReadOutcome::Eof,
        }
    }
}

/// Invocations a [`RecordingExecutor`] has seen.
#[derive(Clone, Default)]
pub struct Recorder(pub Arc<Mutex<Vec<CommandParameters>>>);

impl Recorder {
    pub fn invocations(&self) -> Vec<CommandParameters> {
        self.0.lock().expect("recorder lock").clone()
    }
}

/// Test executor that records its parameters and returns a fixed code.
pub struct RecordingExecutor {
    pub recorder: Recorder,
    pub exit_code: i32,
}

impl CommandExecutor for RecordingExecutor {
    fn execute(
        &self,
        params: &CommandParameters,
        _ctx: &mut ExecContext<'_>,
    ) -> Result<i32, ExecError> {
        self.recorder
            .0
            .lock()
            .expect("recorder lock")
            .push(params.clone());
        Ok(self.exit_code)
    }
}

/// Register a recording command and hand back its recorder.
pub fn register_recording(
    engine: &ShellEngine,
    kind: ShellKind,
    name: &str,
    shapes: Vec<ArgumentShape>,
) -> Recorder {
    let recorder = Recorder::default();
    let command = CommandInfo::new(
        name,
        "records invocations",
        shapes,
        Arc::new(RecordingExecutor {
            recorder: recorder.clone(),
            exit_code: 0,
        }),
    );
    engine
        .registry_mut()
        .register(kind, command)
        .expect("register recording command");
    recorder
}

/// Same, but visible from every shell type.
pub fn register_recording_unified(
    engine: &ShellEngine,
    name: &str,
    shapes: Vec<ArgumentShape>,
) -> Recorder {
    let recorder = Recorder::default();
    let command = CommandInfo::new(
        name,
        "records invocations",
        shapes,
        Arc::new(RecordingExecutor {
            recorder: recorder.clone(),
            exit_code: 0,
        }),
    );
    engine
        .registry_mut()
        .register_unified(command)
        .expect("register recording command");
    recorder
}
