//! Commands available identically from every shell type.

use std::sync::Arc;

use crate::args::{ArgumentPart, ArgumentShape};
use crate::command::{CommandInfo, CommandParameters, ExecContext, ExecError};
use crate::engine::{EngineError, ShellEngine};

pub(super) fn install(engine: &ShellEngine) -> Result<(), EngineError> {
    let mut registry = engine.registry_mut();
    registry.register_unified(exit_command())?;
    registry.register_unified(help_command())?;
    Ok(())
}

fn exit_command() -> CommandInfo {
    CommandInfo::new(
        "exit",
        "Leave the current shell",
        vec![ArgumentShape::none()],
        Arc::new(exit_exec),
    )
}

fn exit_exec(_params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    ctx.session.request_exit();
    Ok(0)
}

fn help_command() -> CommandInfo {
    let shape = ArgumentShape::of(vec![ArgumentPart::optional("command")])
        .unwrap_or_else(|_| ArgumentShape::none());
    CommandInfo::new(
        "help",
        "List commands, or show usage for one command",
        vec![shape],
        Arc::new(help_exec),
    )
}

fn help_exec(params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    let kind = ctx.session.kind.clone();

    if let Some(name) = params.arg(0) {
        let name = name.to_string();
        let resolved = ctx.engine.registry().resolve(&kind, &name);
        return match resolved {
            Some(cmd) => {
                ctx.write_line(&format!("{} - {}", cmd.name, cmd.help))?;
                for usage in cmd.usage_lines() {
                    ctx.write_line(&format!("  usage: {}", usage))?;
                }
                Ok(0)
            }
            None => {
                ctx.write_line(&format!("No such command: {}", name))?;
                Ok(1)
            }
        };
    }

    let commands = ctx.engine.registry().visible_commands(&kind);
    let width = terminal_width();
    let name_width = commands
        .iter()
        .filter(|c| !c.flags.obsolete)
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);
    for cmd in commands {
        if cmd.flags.obsolete {
            continue;
        }
        let mut line = format!("{:<name_width$}  {}", cmd.name, cmd.help);
        if line.chars().count() > width {
            line = line.chars().take(width.saturating_sub(3)).collect::<String>() + "...";
        }
        ctx.write_line(&line)?;
    }
    Ok(0)
}

fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}
