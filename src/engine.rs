//! The shell engine
//!
//! A process-scoped value owning the command registry, the shell
//! registrations, the stack of live cancel gates, and the per-shell-type
//! prompt locks. It is passed explicitly to the tokenizer, dispatcher, and
//! interpreter; there is no global state.
//!
//! Nesting is call-stack recursion: entering a sub-shell runs its loop
//! inside the parent's dispatch call, and the parent is fully suspended
//! until the child bails.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::debug;

use crate::cancel::CancelGate;
use crate::dispatch::{self, DispatchError};
use crate::lexer::Tokenizer;
use crate::registry::{CommandRegistry, RegistryError};
use crate::session::{
    BailReason, LineSource, NullSource, ReadOutcome, ShellKind, ShellRegistration, ShellSession,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No shell registered for kind: {0}")]
    UnknownShell(ShellKind),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// How a session loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The session was popped; the parent resumes.
    Popped,
    /// The bottom session bailed, or a shutdown was requested: the process
    /// should terminate.
    Shutdown,
}

struct RegisteredShell {
    factory: Arc<dyn Fn(&str) -> ShellSession + Send + Sync>,
    prompt_preset: String,
}

pub struct ShellEngine {
    registry: RwLock<CommandRegistry>,
    shells: RwLock<HashMap<ShellKind, RegisteredShell>>,
    /// Gates of the live sessions, innermost last. The interrupt handler
    /// signals the top one.
    gates: Mutex<Vec<Arc<CancelGate>>>,
    /// One lock per shell *type*, serializing prompt redraws against
    /// watchdog/monitor output. Never held across command execution.
    prompt_locks: Mutex<HashMap<ShellKind, Arc<Mutex<()>>>>,
    /// Where the alias command persists its table, when set.
    alias_store: Mutex<Option<PathBuf>>,
    tokenizer: Tokenizer,
}

impl Default for ShellEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellEngine {
    pub fn new() -> Self {
        ShellEngine {
            registry: RwLock::new(CommandRegistry::new()),
            shells: RwLock::new(HashMap::new()),
            gates: Mutex::new(Vec::new()),
            prompt_locks: Mutex::new(HashMap::new()),
            alias_store: Mutex::new(None),
            tokenizer: Tokenizer::default(),
        }
    }

    pub fn with_switch_prefix(prefix: char) -> Self {
        let mut engine = Self::new();
        engine.tokenizer = Tokenizer::new(prefix);
        engine
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Shared read access to the registry. Keep the guard short-lived;
    /// addon load/unload takes the write half from its own thread.
    pub fn registry(&self) -> RwLockReadGuard<'_, CommandRegistry> {
        match self.registry.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Exclusive access to the registry, for registration and aliases.
    pub fn registry_mut(&self) -> RwLockWriteGuard<'_, CommandRegistry> {
        match self.registry.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a protocol shell: its session factory, default command
    /// table, and prompt preset.
    pub fn register_shell(&self, registration: ShellRegistration) -> Result<(), EngineError> {
        let ShellRegistration {
            kind,
            factory,
            commands,
            prompt_preset,
        } = registration;
        {
            let mut registry = self.registry_mut();
            for command in commands {
                registry.register(kind.clone(), command)?;
            }
        }
        debug!(shell = %kind, "shell registered");
        self.write_shells().insert(
            kind,
            RegisteredShell {
                factory,
                prompt_preset,
            },
        );
        Ok(())
    }

    pub fn shell_registered(&self, kind: &ShellKind) -> bool {
        self.read_shells().contains_key(kind)
    }

    /// Create a session for the main shell, using its registered prompt
    /// preset when available.
    pub fn main_session(&self) -> ShellSession {
        self.new_session(&ShellKind::Main, "")
            .unwrap_or_else(|_| ShellSession::new(ShellKind::Main))
    }

    /// Instantiate a session of the given kind through its factory.
    pub fn new_session(&self, kind: &ShellKind, arg: &str) -> Result<ShellSession, EngineError> {
        let shells = self.read_shells();
        let registered = shells
            .get(kind)
            .ok_or_else(|| EngineError::UnknownShell(kind.clone()))?;
        let mut session = (registered.factory)(arg);
        if session.prompt_preset.is_empty() {
            session.prompt_preset = registered.prompt_preset.clone();
        }
        Ok(session)
    }

    /// Push a new session of the given kind and run its loop to
    /// completion. This is what shell-launcher commands call; it returns
    /// once the child session bails.
    pub fn enter_shell(
        &self,
        kind: &ShellKind,
        arg: &str,
        input: &mut dyn LineSource,
    ) -> Result<LoopExit, EngineError> {
        let mut session = self.new_session(kind, arg)?;
        debug!(shell = %kind, arg, "entering sub-shell");
        Ok(self.run_session(&mut session, input))
    }

    /// Run a session's prompt loop: read, tokenize, dispatch, repeat until
    /// the bail flag is set. An interrupted read clears the gate and
    /// re-prompts; end of input exits the session.
    pub fn run_session(&self, session: &mut ShellSession, input: &mut dyn LineSource) -> LoopExit {
        self.push_gate(session.cancel.clone());
        let depth = self.depth();

        let reason = loop {
            if let Some(reason) = session.bail() {
                break reason;
            }
            match input.read_line(session) {
                ReadOutcome::Line(line) => {
                    dispatch::dispatch_and_report(self, session, input, &line);
                }
                ReadOutcome::Interrupted => {
                    session.cancel.clear();
                }
                ReadOutcome::Eof => {
                    session.request_exit();
                }
            }
        };

        self.pop_gate();
        debug!(shell = %session.kind, ?reason, "session ended");

        // Popping the bottom session is a shutdown request, never a no-op.
        if depth == 1 || reason == BailReason::Shutdown {
            LoopExit::Shutdown
        } else {
            LoopExit::Popped
        }
    }

    /// Dispatch a single line with no interactive input behind it. Used by
    /// `-c` one-shot mode, rc sourcing, and tests.
    pub fn run_line(
        &self,
        session: &mut ShellSession,
        line: &str,
    ) -> Result<i32, DispatchError> {
        let mut input = NullSource;
        dispatch::dispatch(self, session, &mut input, line)
    }

    /// Signal the current (innermost) session's cancel gate. Wired to the
    /// process interrupt handler.
    pub fn interrupt(&self) {
        if let Some(gate) = self.current_gate() {
            gate.signal();
        }
    }

    pub fn current_gate(&self) -> Option<Arc<CancelGate>> {
        self.lock_gates().last().cloned()
    }

    /// Number of live sessions.
    pub fn depth(&self) -> usize {
        self.lock_gates().len()
    }

    pub(crate) fn push_gate(&self, gate: Arc<CancelGate>) {
        self.lock_gates().push(gate);
    }

    pub(crate) fn pop_gate(&self) {
        self.lock_gates().pop();
    }

    /// The redraw lock for a shell type. Prompt renderers hold it while
    /// writing the prompt; it does not serialize command execution.
    pub fn prompt_lock(&self, kind: &ShellKind) -> Arc<Mutex<()>> {
        let mut locks = match self.prompt_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(kind.clone()).or_default().clone()
    }

    /// Configure where alias changes are persisted.
    pub fn set_alias_store(&self, path: PathBuf) {
        *self.lock_alias_store() = Some(path);
    }

    pub fn alias_store(&self) -> Option<PathBuf> {
        self.lock_alias_store().clone()
    }

    fn read_shells(&self) -> RwLockReadGuard<'_, HashMap<ShellKind, RegisteredShell>> {
        match self.shells.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_shells(&self) -> RwLockWriteGuard<'_, HashMap<ShellKind, RegisteredShell>> {
        match self.shells.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_gates(&self) -> MutexGuard<'_, Vec<Arc<CancelGate>>> {
        match self.gates.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_alias_store(&self) -> MutexGuard<'_, Option<PathBuf>> {
        match self.alias_store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
