//! Command values: executors, metadata, and bound parameters.

use std::io::Write;
use std::sync::Arc;

use crate::args::ArgumentShape;
use crate::cancel::Interrupted;
use crate::engine::ShellEngine;
use crate::session::{LineSource, ShellSession};

/// Error type executors surface; anything they raise becomes an
/// `ExecutorFault` at the dispatcher boundary.
pub type ExecError = Box<dyn std::error::Error + Send + Sync>;

/// The capability a registered command implements.
///
/// Executors write their primary output through the context sink so the
/// dispatcher can transparently redirect or capture it; diagnostics go to
/// stderr directly. The returned integer is the command's exit code - a
/// non-zero code is data, not an error.
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, params: &CommandParameters, ctx: &mut ExecContext<'_>)
        -> Result<i32, ExecError>;
}

impl<F> CommandExecutor for F
where
    F: Fn(&CommandParameters, &mut ExecContext<'_>) -> Result<i32, ExecError> + Send + Sync,
{
    fn execute(
        &self,
        params: &CommandParameters,
        ctx: &mut ExecContext<'_>,
    ) -> Result<i32, ExecError> {
        self(params, ctx)
    }
}

/// Behavior flags carried by a registered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFlags {
    /// The command's primary output may be redirected to a file.
    pub redirectable: bool,
    /// The command's primary output may be captured into a variable.
    pub wrappable: bool,
    /// The command is kept for compatibility and hidden from help.
    pub obsolete: bool,
}

impl Default for CommandFlags {
    fn default() -> Self {
        CommandFlags {
            redirectable: true,
            wrappable: true,
            obsolete: false,
        }
    }
}

/// A registered command: name, grammar, executor, flags.
#[derive(Clone)]
pub struct CommandInfo {
    pub name: String,
    pub help: String,
    pub shapes: Vec<ArgumentShape>,
    pub flags: CommandFlags,
    pub executor: Arc<dyn CommandExecutor>,
}

impl CommandInfo {
    pub fn new(
        name: &str,
        help: &str,
        shapes: Vec<ArgumentShape>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        CommandInfo {
            name: name.to_string(),
            help: help.to_string(),
            shapes,
            flags: CommandFlags::default(),
            executor,
        }
    }

    pub fn with_flags(mut self, flags: CommandFlags) -> Self {
        self.flags = flags;
        self
    }

    /// All usage lines for this command, one per declared shape.
    pub fn usage_lines(&self) -> Vec<String> {
        self.shapes
            .iter()
            .map(|s| {
                let body = s.usage();
                if body.is_empty() {
                    self.name.clone()
                } else {
                    format!("{} {}", self.name, body)
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for CommandInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandInfo")
            .field("name", &self.name)
            .field("shapes", &self.shapes.len())
            .field("flags", &self.flags)
            .finish()
    }
}

/// Result of matching a tokenized line against one of a command's shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandParameters {
    /// Positional values actually supplied, in order.
    pub arguments_list: Vec<String>,
    /// The original unsplit positional substring; internal whitespace and
    /// operators survive for commands that need the raw text.
    pub arguments_text: String,
    /// Supplied switches with their values.
    pub switches: Vec<(String, Option<String>)>,
    /// The raw line as typed.
    pub raw: String,
}

impl CommandParameters {
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.arguments_list.get(index).map(String::as_str)
    }

    pub fn has_switch(&self, name: &str) -> bool {
        self.switches.iter().any(|(n, _)| n == name)
    }

    pub fn switch_value(&self, name: &str) -> Option<&str> {
        self.switches
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }
}

/// Everything an executor may touch while running.
pub struct ExecContext<'a> {
    /// The engine, for registry access and sub-shell entry.
    pub engine: &'a ShellEngine,
    /// The session the command runs in.
    pub session: &'a mut ShellSession,
    /// The line source feeding this session; sub-shell launchers hand it to
    /// the nested loop.
    pub input: &'a mut dyn LineSource,
    pub(crate) sink: &'a mut dyn Write,
}

impl<'a> ExecContext<'a> {
    /// Write primary output followed by a newline.
    pub fn write_line(&mut self, text: &str) -> std::io::Result<()> {
        writeln!(self.sink, "{}", text)
    }

    /// Write primary output verbatim.
    pub fn write(&mut self, text: &str) -> std::io::Result<()> {
        write!(self.sink, "{}", text)
    }

    /// Whether an interrupt has been requested for this session.
    pub fn cancel_requested(&self) -> bool {
        self.session.cancel.is_signaled()
    }

    /// Bail out early if an interrupt has been requested. Long-running
    /// executors call this between units of work.
    pub fn checkpoint(&self) -> Result<(), Interrupted> {
        self.session.cancel.checkpoint()
    }
}
