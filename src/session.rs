//! Shell sessions
//!
//! One [`ShellSession`] per active shell instance. Sessions form a LIFO
//! stack: entering a sub-shell (`json file`, `ftp host`, ...) pushes a new
//! session and runs its prompt loop; setting the bail flag pops it and
//! control returns to the parent. Exactly one session is current at a time.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::cancel::CancelGate;
use crate::command::CommandInfo;

/// The shell types the engine knows about. Addon-defined shells use
/// [`ShellKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShellKind {
    Main,
    Ftp,
    Sftp,
    Http,
    Sql,
    Mail,
    Archive,
    Json,
    ScriptTest,
    Custom(String),
}

impl std::fmt::Display for ShellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShellKind::Main => "main",
            ShellKind::Ftp => "ftp",
            ShellKind::Sftp => "sftp",
            ShellKind::Http => "http",
            ShellKind::Sql => "sql",
            ShellKind::Mail => "mail",
            ShellKind::Archive => "archive",
            ShellKind::Json => "json",
            ShellKind::ScriptTest => "script-test",
            ShellKind::Custom(name) => name,
        };
        f.write_str(name)
    }
}

impl FromStr for ShellKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "main" => ShellKind::Main,
            "ftp" => ShellKind::Ftp,
            "sftp" => ShellKind::Sftp,
            "http" => ShellKind::Http,
            "sql" => ShellKind::Sql,
            "mail" => ShellKind::Mail,
            "archive" => ShellKind::Archive,
            "json" => ShellKind::Json,
            "script-test" => ShellKind::ScriptTest,
            other => ShellKind::Custom(other.to_string()),
        })
    }
}

/// Why a session's loop should end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BailReason {
    /// Leave this shell and resume the parent.
    SubshellExit,
    /// Shut the whole process down.
    Shutdown,
}

/// One active shell instance.
#[derive(Debug)]
pub struct ShellSession {
    pub kind: ShellKind,
    /// Shell-local notion of "current directory"; for the JSON shell this
    /// is the document path, for filesystem-like shells a directory.
    pub working_path: String,
    /// Display preset for the prompt; the line source expands it.
    pub prompt_preset: String,
    /// Session variables: `->$var` captures and `set` land here.
    pub vars: HashMap<String, String>,
    /// Interrupt handle for this session.
    pub cancel: Arc<CancelGate>,
    bail: Option<BailReason>,
}

impl ShellSession {
    pub fn new(kind: ShellKind) -> Self {
        ShellSession {
            kind,
            working_path: String::new(),
            prompt_preset: String::new(),
            vars: HashMap::new(),
            cancel: Arc::new(CancelGate::new()),
            bail: None,
        }
    }

    pub fn with_working_path(mut self, path: &str) -> Self {
        self.working_path = path.to_string();
        self
    }

    pub fn with_prompt(mut self, preset: &str) -> Self {
        self.prompt_preset = preset.to_string();
        self
    }

    /// Ask the loop to leave this shell after the current command.
    pub fn request_exit(&mut self) {
        self.bail = Some(BailReason::SubshellExit);
    }

    /// Ask the loop to shut the process down.
    pub fn request_shutdown(&mut self) {
        self.bail = Some(BailReason::Shutdown);
    }

    pub fn bail(&self) -> Option<BailReason> {
        self.bail
    }

    /// Variable lookup, empty string when unset.
    pub fn var(&self, name: &str) -> String {
        self.vars.get(name).cloned().unwrap_or_default()
    }
}

/// What a blocking read produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Line(String),
    /// The read was interrupted (keyboard break). The session survives.
    Interrupted,
    /// End of input; the session should exit.
    Eof,
}

/// Source of input lines for a session loop: the interactive editor, a
/// script, or a test fixture.
pub trait LineSource {
    /// Block until a line, an interrupt, or end of input. The session is
    /// passed so interactive sources can render its prompt.
    fn read_line(&mut self, session: &ShellSession) -> ReadOutcome;
}

/// A line source that is immediately exhausted. Used by one-shot dispatch
/// and the script interpreter, where sub-shell launchers have nothing to
/// read from.
#[derive(Debug, Default)]
pub struct NullSource;

impl LineSource for NullSource {
    fn read_line(&mut self, _session: &ShellSession) -> ReadOutcome {
        ReadOutcome::Eof
    }
}

/// A bundle a protocol-shell collaborator registers: how to create a
/// session of this kind plus the commands available inside it.
pub struct ShellRegistration {
    pub kind: ShellKind,
    /// Creates the session; the argument is whatever the launcher command
    /// passed (a file to open, a host to connect to, ...).
    pub factory: Arc<dyn Fn(&str) -> ShellSession + Send + Sync>,
    /// Command table installed for this shell type at registration time.
    pub commands: Vec<CommandInfo>,
    /// Default prompt preset applied to new sessions.
    pub prompt_preset: String,
}

impl ShellRegistration {
    pub fn new(
        kind: ShellKind,
        prompt_preset: &str,
        factory: Arc<dyn Fn(&str) -> ShellSession + Send + Sync>,
        commands: Vec<CommandInfo>,
    ) -> Self {
        ShellRegistration {
            kind,
            factory,
            commands,
            prompt_preset: prompt_preset.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_kind_round_trips_through_display() {
        for kind in [
            ShellKind::Main,
            ShellKind::Ftp,
            ShellKind::Json,
            ShellKind::ScriptTest,
            ShellKind::Custom("notes".into()),
        ] {
            let name = kind.to_string();
            let parsed: ShellKind = name.parse().unwrap_or(ShellKind::Main);
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn bail_starts_unset() {
        let mut s = ShellSession::new(ShellKind::Main);
        assert_eq!(s.bail(), None);
        s.request_exit();
        assert_eq!(s.bail(), Some(BailReason::SubshellExit));
    }
}
