//! Command registry
//!
//! Per-shell-type command tables, the unified (cross-shell) table, addon
//! registrations, and the alias store. Resolution order: alias (single
//! hop), then the shell-type table, then the unified table.
//!
//! The registry is read-mostly; the engine wraps it in a reader-writer
//! lock so addon load/unload from a lifecycle thread stays mutually
//! exclusive with lookups.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::command::CommandInfo;
use crate::session::ShellKind;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Duplicate command: {0}")]
    DuplicateCommand(String),
    #[error("Alias target is not a command: {0}")]
    UnknownTarget(String),
    #[error("Alias store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Alias store format error: {0}")]
    Store(#[from] serde_json::Error),
}

/// One persisted alias: `(shell, source)` invokes `target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasRecord {
    pub source: String,
    pub target: String,
    pub shell: String,
}

#[derive(Default)]
pub struct CommandRegistry {
    tables: HashMap<ShellKind, HashMap<String, Arc<CommandInfo>>>,
    unified: HashMap<String, Arc<CommandInfo>>,
    addon_names: HashMap<ShellKind, HashSet<String>>,
    aliases: HashMap<ShellKind, HashMap<String, String>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        CommandRegistry::default()
    }

    /// Resolve a command name as seen from a shell of the given kind.
    ///
    /// Aliases are substituted once (single hop) before the tables are
    /// consulted; an alias therefore shadows a real command of the same
    /// name for invocation.
    pub fn resolve(&self, kind: &ShellKind, name: &str) -> Option<Arc<CommandInfo>> {
        let resolved = self
            .aliases
            .get(kind)
            .and_then(|m| m.get(name))
            .map(String::as_str)
            .unwrap_or(name);
        self.tables
            .get(kind)
            .and_then(|t| t.get(resolved))
            .or_else(|| self.unified.get(resolved))
            .cloned()
    }

    /// Register a command into a shell-type table.
    pub fn register(&mut self, kind: ShellKind, command: CommandInfo) -> Result<(), RegistryError> {
        let table = self.tables.entry(kind.clone()).or_default();
        if table.contains_key(&command.name) {
            return Err(RegistryError::DuplicateCommand(command.name));
        }
        debug!(shell = %kind, command = %command.name, "register command");
        table.insert(command.name.clone(), Arc::new(command));
        Ok(())
    }

    /// Register a command available from every shell type.
    pub fn register_unified(&mut self, command: CommandInfo) -> Result<(), RegistryError> {
        if self.unified.contains_key(&command.name) {
            return Err(RegistryError::DuplicateCommand(command.name));
        }
        debug!(command = %command.name, "register unified command");
        self.unified.insert(command.name.clone(), Arc::new(command));
        Ok(())
    }

    /// Remove a command from a shell-type table. Idempotent; removing an
    /// absent name is not an error (addons unregister during unload).
    pub fn unregister(&mut self, kind: &ShellKind, name: &str) {
        if let Some(table) = self.tables.get_mut(kind) {
            if table.remove(name).is_some() {
                debug!(shell = %kind, command = name, "unregister command");
            }
        }
        if let Some(names) = self.addon_names.get_mut(kind) {
            names.remove(name);
        }
    }

    /// Addon entry point: merge a batch of commands into a shell-type
    /// table. The batch is validated first so a duplicate leaves the
    /// registry untouched.
    pub fn register_commands(
        &mut self,
        kind: ShellKind,
        commands: Vec<CommandInfo>,
    ) -> Result<(), RegistryError> {
        {
            let table = self.tables.entry(kind.clone()).or_default();
            let mut batch: HashSet<&str> = HashSet::new();
            for cmd in &commands {
                if table.contains_key(&cmd.name) || !batch.insert(&cmd.name) {
                    return Err(RegistryError::DuplicateCommand(cmd.name.clone()));
                }
            }
        }
        let names = self.addon_names.entry(kind.clone()).or_default();
        for cmd in &commands {
            names.insert(cmd.name.clone());
        }
        for cmd in commands {
            self.register(kind.clone(), cmd)?;
        }
        Ok(())
    }

    /// Addon exit point: remove a batch of names. Idempotent.
    pub fn unregister_commands(&mut self, kind: &ShellKind, names: &[&str]) {
        for name in names {
            self.unregister(kind, name);
        }
    }

    /// Names an addon registered for a shell type.
    pub fn addon_commands(&self, kind: &ShellKind) -> Vec<String> {
        let mut names: Vec<String> = self
            .addon_names
            .get(kind)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Everything visible from a shell of the given kind: its own table
    /// merged with the unified table (shell-specific wins on collision).
    pub fn visible_commands(&self, kind: &ShellKind) -> Vec<Arc<CommandInfo>> {
        let mut merged: HashMap<&str, Arc<CommandInfo>> = HashMap::new();
        for (name, cmd) in &self.unified {
            merged.insert(name.as_str(), cmd.clone());
        }
        if let Some(table) = self.tables.get(kind) {
            for (name, cmd) in table {
                merged.insert(name.as_str(), cmd.clone());
            }
        }
        let mut list: Vec<Arc<CommandInfo>> = merged.into_values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Create or replace an alias. The target must resolve to a command so
    /// chains cannot form (resolution is single-hop by construction).
    pub fn register_alias(
        &mut self,
        kind: ShellKind,
        source: &str,
        target: &str,
    ) -> Result<(), RegistryError> {
        if self.resolve_unaliased(&kind, target).is_none() {
            return Err(RegistryError::UnknownTarget(target.to_string()));
        }
        debug!(shell = %kind, source, target, "register alias");
        self.aliases
            .entry(kind)
            .or_default()
            .insert(source.to_string(), target.to_string());
        Ok(())
    }

    /// Remove an alias. Idempotent.
    pub fn remove_alias(&mut self, kind: &ShellKind, source: &str) {
        if let Some(table) = self.aliases.get_mut(kind) {
            table.remove(source);
        }
    }

    pub fn alias_target(&self, kind: &ShellKind, source: &str) -> Option<&str> {
        self.aliases
            .get(kind)
            .and_then(|m| m.get(source))
            .map(String::as_str)
    }

    fn resolve_unaliased(&self, kind: &ShellKind, name: &str) -> Option<Arc<CommandInfo>> {
        self.tables
            .get(kind)
            .and_then(|t| t.get(name))
            .or_else(|| self.unified.get(name))
            .cloned()
    }

    /// The alias table as a flat record list, stable order.
    pub fn alias_records(&self) -> Vec<AliasRecord> {
        let mut records: Vec<AliasRecord> = self
            .aliases
            .iter()
            .flat_map(|(kind, table)| {
                table.iter().map(move |(source, target)| AliasRecord {
                    source: source.clone(),
                    target: target.clone(),
                    shell: kind.to_string(),
                })
            })
            .collect();
        records.sort_by(|a, b| (&a.shell, &a.source).cmp(&(&b.shell, &b.source)));
        records
    }

    /// Persist the alias table as a JSON flat list.
    pub fn save_aliases(&self, path: &Path) -> Result<(), RegistryError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.alias_records())?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load aliases from a JSON flat list. Missing file is not an error.
    /// Returns the number of records loaded.
    pub fn load_aliases(&mut self, path: &Path) -> Result<usize, RegistryError> {
        let data = match fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        let records: Vec<AliasRecord> = serde_json::from_str(&data)?;
        let count = records.len();
        for record in records {
            let kind: ShellKind = record
                .shell
                .parse()
                .unwrap_or(ShellKind::Custom(record.shell.clone()));
            self.aliases
                .entry(kind)
                .or_default()
                .insert(record.source, record.target);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::ArgumentShape;
    use crate::command::{CommandParameters, ExecContext, ExecError};

    fn noop_exec(_p: &CommandParameters, _c: &mut ExecContext<'_>) -> Result<i32, ExecError> {
        Ok(0)
    }

    fn noop_command(name: &str) -> CommandInfo {
        CommandInfo::new(
            name,
            "test command",
            vec![ArgumentShape::none()],
            Arc::new(noop_exec),
        )
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut reg = CommandRegistry::new();
        reg.register(ShellKind::Main, noop_command("x")).unwrap();
        assert!(matches!(
            reg.register(ShellKind::Main, noop_command("x")),
            Err(RegistryError::DuplicateCommand(_))
        ));
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut reg = CommandRegistry::new();
        reg.register(ShellKind::Main, noop_command("x")).unwrap();
        reg.unregister(&ShellKind::Main, "x");
        reg.unregister(&ShellKind::Main, "x");
        assert!(reg.resolve(&ShellKind::Main, "x").is_none());
    }

    #[test]
    fn unified_visible_from_every_shell() {
        let mut reg = CommandRegistry::new();
        reg.register_unified(noop_command("exit")).unwrap();
        assert!(reg.resolve(&ShellKind::Main, "exit").is_some());
        assert!(reg.resolve(&ShellKind::Ftp, "exit").is_some());
    }

    #[test]
    fn shell_table_wins_over_unified() {
        let mut reg = CommandRegistry::new();
        reg.register_unified(noop_command("help")).unwrap();
        let mut shell_help = noop_command("help");
        shell_help.help = "shell-specific".to_string();
        reg.register(ShellKind::Ftp, shell_help).unwrap();
        let resolved = reg.resolve(&ShellKind::Ftp, "help").unwrap();
        assert_eq!(resolved.help, "shell-specific");
    }

    #[test]
    fn alias_resolution_is_single_hop() {
        let mut reg = CommandRegistry::new();
        reg.register(ShellKind::Main, noop_command("clear")).unwrap();
        reg.register_alias(ShellKind::Main, "cls", "clear").unwrap();
        // cls -> clear resolves; an alias pointing at another alias cannot
        // be created because the target must be a real command.
        assert!(reg.resolve(&ShellKind::Main, "cls").is_some());
        assert!(matches!(
            reg.register_alias(ShellKind::Main, "c", "cls"),
            Err(RegistryError::UnknownTarget(_))
        ));
    }

    #[test]
    fn addon_batch_is_atomic() {
        let mut reg = CommandRegistry::new();
        reg.register(ShellKind::Main, noop_command("taken")).unwrap();
        let result =
            reg.register_commands(ShellKind::Main, vec![noop_command("new"), noop_command("taken")]);
        assert!(matches!(result, Err(RegistryError::DuplicateCommand(_))));
        assert!(reg.resolve(&ShellKind::Main, "new").is_none());
    }

    #[test]
    fn alias_records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");

        let mut reg = CommandRegistry::new();
        reg.register(ShellKind::Main, noop_command("clear")).unwrap();
        reg.register_alias(ShellKind::Main, "cls", "clear").unwrap();
        reg.save_aliases(&path).unwrap();

        let mut fresh = CommandRegistry::new();
        fresh.register(ShellKind::Main, noop_command("clear")).unwrap();
        assert_eq!(fresh.load_aliases(&path).unwrap(), 1);
        assert_eq!(fresh.alias_target(&ShellKind::Main, "cls"), Some("clear"));
    }
}
