use std::env;
use std::path::PathBuf;

use kernsh::{script, ShellEngine};

/// Get home directory
pub(crate) fn dirs_home() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}

/// Where the alias table is persisted (~/.kernsh/aliases.json)
pub(crate) fn alias_store_path() -> Option<PathBuf> {
    dirs_home().map(|h| h.join(".kernsh").join("aliases.json"))
}

/// Load and execute ~/.kernshrc if it exists.
///
/// The rc file is an ordinary batch script sourced through the script
/// interpreter; a malformed rc file is a warning, not a fatal error.
pub(crate) fn load_rc(engine: &ShellEngine) {
    let rc_path = match dirs_home() {
        Some(home) => home.join(".kernshrc"),
        None => return,
    };
    if !rc_path.exists() {
        return;
    }

    let session = engine.main_session();
    if let Err(e) = script::execute_script(engine, &session, &rc_path, &[]) {
        eprintln!("Warning: {}", e);
    }
}
