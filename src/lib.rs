//! kernsh - a simulated-kernel command shell
//!
//! # Overview
//!
//! kernsh is the command shell engine of a terminal "kernel simulator":
//! it turns a line of text into a validated, executed command, manages a
//! stack of nested shell sessions each with its own command vocabulary,
//! and interprets batch scripts through the same execution path as
//! interactive input.
//!
//! # Core Concepts
//!
//! ## Declarative argument grammar
//!
//! Each command declares one or more shapes: ordered positional parts
//! (required, optional, or exact-wording) plus switches. The dispatcher
//! tries the shapes in order and the first match wins:
//!
//! ```text
//! alias add cls clear      # matches the <add> <alias> <command> shape
//! alias rem cls            # matches the <rem> <alias> shape
//! alias drop cls           # ArgumentMismatch, usage printed
//! ```
//!
//! ## Nested sessions
//!
//! Shell-launcher commands push a new session and run its loop until the
//! session bails; the parent is suspended meanwhile:
//!
//! ```text
//! json config.json         # enter the JSON editor shell
//! get /name                # resolved against the JSON shell's table
//! exit                     # pop back to the main shell
//! ```
//!
//! ## Redirection sugar
//!
//! `> path`, `>> path`, and `-> $var` are stripped before grammar matching
//! and applied as scoped sinks around the executor call.
//!
//! # Example
//!
//! ```rust
//! use kernsh::{builtins, ShellEngine};
//!
//! let engine = ShellEngine::new();
//! builtins::install(&engine).unwrap();
//!
//! let mut session = engine.main_session();
//! let code = engine.run_line(&mut session, "echo hello -> $out").unwrap();
//! assert_eq!(code, 0);
//! assert_eq!(session.var("out"), "hello");
//! ```

pub mod args;
pub mod builtins;
pub mod cancel;
pub mod command;
pub mod dispatch;
pub mod engine;
pub mod lexer;
pub mod registry;
pub mod script;
pub mod session;

// Re-export commonly used items
pub use args::{ArgumentPart, ArgumentShape, MatchFailure, SwitchInfo};
pub use cancel::{CancelGate, Interrupted};
pub use command::{
    CommandExecutor, CommandFlags, CommandInfo, CommandParameters, ExecContext, ExecError,
};
pub use dispatch::{dispatch, dispatch_and_report, DispatchError};
pub use engine::{EngineError, LoopExit, ShellEngine};
pub use lexer::{substitute_line, tokenize, LexError, Redirection, TokenizedLine, Tokenizer};
pub use registry::{AliasRecord, CommandRegistry, RegistryError};
pub use script::{execute_script, ScriptError};
pub use session::{
    BailReason, LineSource, NullSource, ReadOutcome, ShellKind, ShellRegistration, ShellSession,
};
