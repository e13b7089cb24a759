//! Built-in command tables
//!
//! The unified commands available from every shell, the main shell's own
//! table, and the JSON editor sub-shell. Everything here goes through the
//! same registration APIs an external collaborator would use.

mod calc;
mod jsonshell;
mod mainshell;
mod unified;

use crate::engine::{EngineError, ShellEngine};

/// Install every built-in table into the engine.
pub fn install(engine: &ShellEngine) -> Result<(), EngineError> {
    unified::install(engine)?;
    mainshell::install(engine)?;
    jsonshell::install(engine)?;
    Ok(())
}
