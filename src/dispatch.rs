//! Execution dispatcher
//!
//! Turns a raw line into a validated, executed command. States per
//! invocation: Parsed -> GrammarMatched -> Executing -> Completed, Failed,
//! or Cancelled.
//!
//! Name resolution honors aliases, the shape that matches first wins, and
//! the redirection sugar stripped by the tokenizer is applied here as a
//! scoped sink around the executor call. `CommandNotFound` and
//! `ArgumentMismatch` never unwind past the session loop; an executor
//! error is caught at this boundary, logged, and rendered without killing
//! the session.

use std::fs::{File, OpenOptions};
use std::io::Write;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::args::MatchedArguments;
use crate::cancel::Interrupted;
use crate::command::{CommandInfo, CommandParameters, ExecContext};
use crate::engine::ShellEngine;
use crate::lexer::{ArgToken, LexError, Redirection, TokenizedLine};
use crate::session::{LineSource, ShellSession};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("Command not found: {0}")]
    CommandNotFound(String),
    #[error("{command}: {reason}")]
    ArgumentMismatch {
        command: String,
        reason: String,
        /// One usage line per declared shape, for rendering.
        usages: Vec<String>,
    },
    #[error("{command} failed: {message}")]
    ExecutorFault { command: String, message: String },
    #[error("Cannot open {path}: {message}")]
    RedirectTarget { path: String, message: String },
    #[error("Interrupted")]
    Cancelled,
}

/// Dispatch one line within a session.
///
/// Returns the command's exit code. A non-zero code is data for the
/// caller, not an error; only the conditions in [`DispatchError`] are
/// errors.
pub fn dispatch(
    engine: &ShellEngine,
    session: &mut ShellSession,
    input: &mut dyn LineSource,
    line: &str,
) -> Result<i32, DispatchError> {
    let tokens = match engine.tokenizer().tokenize(line)? {
        Some(t) => t,
        None => return Ok(0),
    };
    debug!(command = %tokens.command, shell = %session.kind, "parsed");

    let command = engine
        .registry()
        .resolve(&session.kind, &tokens.command)
        .ok_or_else(|| DispatchError::CommandNotFound(tokens.command.clone()))?;

    let matched = match_shapes(&command, &tokens)?;
    debug!(command = %command.name, args = matched.positionals.len(), "grammar matched");

    let params = CommandParameters {
        arguments_list: matched.positionals,
        arguments_text: tokens.arguments_text.clone(),
        switches: matched.switches,
        raw: tokens.raw.clone(),
    };

    execute(engine, session, input, &command, &params, &tokens.redirection)
}

/// Dispatch and render failures per the propagation policy: every failure
/// becomes a one-line message (grammar failures also print the accepted
/// shapes) and the session loop continues.
pub fn dispatch_and_report(
    engine: &ShellEngine,
    session: &mut ShellSession,
    input: &mut dyn LineSource,
    line: &str,
) -> i32 {
    match dispatch(engine, session, input, line) {
        Ok(code) => code,
        Err(DispatchError::Cancelled) => {
            eprintln!("^C");
            130
        }
        Err(DispatchError::ArgumentMismatch {
            command,
            reason,
            usages,
        }) => {
            eprintln!("{}: {}", command, reason);
            for usage in usages {
                eprintln!("  usage: {}", usage);
            }
            2
        }
        Err(e @ DispatchError::CommandNotFound(_)) => {
            eprintln!("{}", e);
            127
        }
        Err(DispatchError::ExecutorFault { command, message }) => {
            error!(command = %command, %message, "executor fault");
            eprintln!("{} failed: {}", command, message);
            1
        }
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    }
}

/// Try each declared shape in order; first match wins.
fn match_shapes(
    command: &CommandInfo,
    tokens: &TokenizedLine,
) -> Result<MatchedArguments, DispatchError> {
    if command.shapes.is_empty() {
        return Ok(lenient_match(&tokens.args));
    }

    let mut first_failure = None;
    for shape in &command.shapes {
        match shape.match_tokens(&tokens.args) {
            Ok(matched) => return Ok(matched),
            Err(failure) => {
                if first_failure.is_none() {
                    first_failure = Some(failure);
                }
            }
        }
    }

    let reason = first_failure
        .map(|f| f.to_string())
        .unwrap_or_else(|| "arguments did not match".to_string());
    Err(DispatchError::ArgumentMismatch {
        command: command.name.clone(),
        reason,
        usages: command.usage_lines(),
    })
}

/// Accept everything; used for commands registered without shapes.
fn lenient_match(args: &[ArgToken]) -> MatchedArguments {
    let mut positionals = Vec::new();
    let mut switches = Vec::new();
    for arg in args {
        match arg {
            ArgToken::Positional(p) => positionals.push(p.clone()),
            ArgToken::Switch { name, value } => switches.push((name.clone(), value.clone())),
        }
    }
    MatchedArguments {
        positionals,
        switches,
    }
}

/// Run the executor with the sink the redirection sugar selects.
fn execute(
    engine: &ShellEngine,
    session: &mut ShellSession,
    input: &mut dyn LineSource,
    command: &CommandInfo,
    params: &CommandParameters,
    redirection: &Option<Redirection>,
) -> Result<i32, DispatchError> {
    match redirection {
        Some(Redirection::Overwrite(path)) if command.flags.redirectable => {
            let mut file = File::create(path).map_err(|e| DispatchError::RedirectTarget {
                path: path.clone(),
                message: e.to_string(),
            })?;
            run_executor(engine, session, input, command, params, &mut file)
        }
        Some(Redirection::Append(path)) if command.flags.redirectable => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| DispatchError::RedirectTarget {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            run_executor(engine, session, input, command, params, &mut file)
        }
        Some(Redirection::Capture(var)) if command.flags.wrappable => {
            let mut buffer: Vec<u8> = Vec::new();
            let code = run_executor(engine, session, input, command, params, &mut buffer)?;
            let text = String::from_utf8_lossy(&buffer);
            session
                .vars
                .insert(var.clone(), text.trim_end_matches('\n').to_string());
            Ok(code)
        }
        Some(other) => {
            warn!(command = %command.name, ?other, "redirection not supported; ignored");
            let stdout = std::io::stdout();
            let mut sink = stdout.lock();
            run_executor(engine, session, input, command, params, &mut sink)
        }
        None => {
            let stdout = std::io::stdout();
            let mut sink = stdout.lock();
            run_executor(engine, session, input, command, params, &mut sink)
        }
    }
}

fn run_executor(
    engine: &ShellEngine,
    session: &mut ShellSession,
    input: &mut dyn LineSource,
    command: &CommandInfo,
    params: &CommandParameters,
    sink: &mut dyn Write,
) -> Result<i32, DispatchError> {
    let cancel = session.cancel.clone();
    let result = {
        let mut ctx = ExecContext {
            engine,
            session,
            input,
            sink,
        };
        command.executor.execute(params, &mut ctx)
    };

    match result {
        Ok(code) => {
            // A request that landed after the last blocking point is
            // cleared here so it cannot leak into the next read.
            cancel.clear();
            debug!(command = %command.name, code, "completed");
            Ok(code)
        }
        Err(e) => {
            if e.downcast_ref::<Interrupted>().is_some() || cancel.is_signaled() {
                cancel.clear();
                debug!(command = %command.name, "cancelled");
                return Err(DispatchError::Cancelled);
            }
            Err(DispatchError::ExecutorFault {
                command: command.name.clone(),
                message: e.to_string(),
            })
        }
    }
}
