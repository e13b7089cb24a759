//! Batch-script interpreter
//!
//! Scripts are plain text, one command per line, same syntax as
//! interactive input. `$name` tokens are variables, `{0}`, `{1}`, ... are
//! the script's own invocation arguments, and `#`-prefixed or leading-
//! space lines are comments.
//!
//! Execution is two passes. The pre-scan declares every `$variable` the
//! file mentions with an empty value, so forward references and same-line
//! self-references never fail lookup. The execution pass then substitutes
//! placeholders per line and feeds the result through the dispatcher,
//! using the interpreter's own pseudo-session.
//!
//! A line of the form `$name = value` assigns the (substituted) value to
//! the variable instead of dispatching.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::dispatch::{self, DispatchError};
use crate::engine::ShellEngine;
use crate::lexer::{ident_char, substitute_line};
use crate::session::{NullSource, ShellSession};

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Cannot read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Script {path} failed at line {line}: {message}")]
    Malformed {
        path: String,
        line: usize,
        message: String,
    },
}

/// Declare every `$variable` the script mentions, with an empty value.
pub fn prescan_variables(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in content.lines() {
        for token in line.split_whitespace() {
            if let Some(name) = token.strip_prefix('$') {
                if !name.is_empty() && name.chars().all(ident_char) {
                    vars.entry(name.to_string()).or_default();
                }
            }
        }
    }
    vars
}

/// `$name = value` assignment lines; returns the name and the raw value
/// text. Comment lines (leading whitespace) never match.
fn parse_assignment(line: &str) -> Option<(String, &str)> {
    if line.starts_with(' ') || line.starts_with('\t') {
        return None;
    }
    let mut words = line.split_whitespace();
    let name = words.next()?.strip_prefix('$')?;
    if name.is_empty() || !name.chars().all(ident_char) {
        return None;
    }
    if words.next()? != "=" {
        return None;
    }
    let eq = line.find('=')?;
    Some((name.to_string(), &line[eq + 1..]))
}

/// Execute a script file with the given invocation arguments.
///
/// The interpreter runs in its own pseudo-session, inheriting the calling
/// session's shell kind and working path; script variables live in that
/// pseudo-session, so `->$var` captures land where substitution looks.
///
/// Any error during the execution pass aborts the rest of the script and
/// surfaces as [`ScriptError::Malformed`]; the calling shell survives.
pub fn execute_script(
    engine: &ShellEngine,
    parent: &ShellSession,
    path: &Path,
    args: &[String],
) -> Result<(), ScriptError> {
    let display_path = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: display_path.clone(),
        source,
    })?;

    let mut session = ShellSession::new(parent.kind.clone())
        .with_working_path(&parent.working_path)
        .with_prompt(&parent.prompt_preset);
    session.vars = prescan_variables(&content);

    info!(script = %display_path, args = args.len(), "script started");
    engine.push_gate(session.cancel.clone());
    let result = run_lines(engine, &mut session, &content, &display_path, args);
    engine.pop_gate();

    match &result {
        Ok(()) => info!(script = %display_path, "script finished"),
        Err(e) => error!(script = %display_path, "script failed: {}", e),
    }
    result
}

fn run_lines(
    engine: &ShellEngine,
    session: &mut ShellSession,
    content: &str,
    display_path: &str,
    args: &[String],
) -> Result<(), ScriptError> {
    let mut input = NullSource;

    for (idx, raw_line) in content.lines().enumerate() {
        if session.bail().is_some() {
            break;
        }

        if let Some((name, value)) = parse_assignment(raw_line) {
            let value = substitute_line(value, &session.vars, args).trim().to_string();
            debug!(script = %display_path, var = %name, %value, "assign");
            session.vars.insert(name, value);
            continue;
        }

        let line = substitute_line(raw_line, &session.vars, args);
        match dispatch::dispatch(engine, session, &mut input, &line) {
            // Exit codes are data; a script keeps running after a
            // non-zero code.
            Ok(_code) => {}
            Err(DispatchError::Cancelled) => {
                info!(script = %display_path, line = idx + 1, "script interrupted");
                break;
            }
            Err(e) => {
                return Err(ScriptError::Malformed {
                    path: display_path.to_string(),
                    line: idx + 1,
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(())
}
