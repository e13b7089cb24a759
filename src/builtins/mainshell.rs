//! The main shell's command table.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::args::{ArgumentPart, ArgumentShape};
use crate::command::{CommandInfo, CommandParameters, ExecContext, ExecError};
use crate::engine::{EngineError, LoopExit, ShellEngine};
use crate::script;
use crate::session::{ShellKind, ShellRegistration, ShellSession};

use super::calc;

pub(super) fn install(engine: &ShellEngine) -> Result<(), EngineError> {
    engine.register_shell(ShellRegistration::new(
        ShellKind::Main,
        "[{user}@{host}] {path} > ",
        Arc::new(main_factory),
        commands(),
    ))
}

fn main_factory(_arg: &str) -> ShellSession {
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    ShellSession::new(ShellKind::Main).with_working_path(&cwd)
}

fn commands() -> Vec<CommandInfo> {
    vec![
        echo_command(),
        calc_command(),
        set_command(),
        alias_command(),
        sleep_command(),
        script_command(),
        json_command(),
    ]
}

fn shape(parts: Vec<ArgumentPart>) -> ArgumentShape {
    ArgumentShape::of(parts).unwrap_or_else(|_| ArgumentShape::none())
}

fn echo_command() -> CommandInfo {
    CommandInfo::new(
        "echo",
        "Print the arguments",
        vec![shape(vec![ArgumentPart::optional("text")])],
        Arc::new(echo_exec),
    )
}

fn echo_exec(params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    ctx.write_line(&params.arguments_list.join(" "))?;
    Ok(0)
}

fn calc_command() -> CommandInfo {
    CommandInfo::new(
        "calc",
        "Evaluate an integer expression",
        vec![shape(vec![ArgumentPart::required("expression")])],
        Arc::new(calc_exec),
    )
}

fn calc_exec(params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    match calc::evaluate(&params.arguments_text) {
        Ok(value) => {
            ctx.write_line(&value.to_string())?;
            Ok(0)
        }
        Err(e) => {
            eprintln!("calc: {}", e);
            Ok(1)
        }
    }
}

fn set_command() -> CommandInfo {
    CommandInfo::new(
        "set",
        "Set a session variable",
        vec![shape(vec![
            ArgumentPart::required("name"),
            ArgumentPart::required("value"),
        ])],
        Arc::new(set_exec),
    )
}

fn set_exec(params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    let name = params.arg(0).unwrap_or_default().to_string();
    let value = params.arguments_list[1..].join(" ");
    ctx.session.vars.insert(name, value);
    Ok(0)
}

fn alias_command() -> CommandInfo {
    let add = shape(vec![
        ArgumentPart::exact("verb", &["add"]),
        ArgumentPart::required("alias"),
        ArgumentPart::required("command"),
    ]);
    let rem = shape(vec![
        ArgumentPart::exact("verb", &["rem"]),
        ArgumentPart::required("alias"),
    ]);
    CommandInfo::new(
        "alias",
        "Add or remove a command alias",
        vec![add, rem],
        Arc::new(alias_exec),
    )
}

fn alias_exec(params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    let kind = ctx.session.kind.clone();
    let verb = params.arg(0).unwrap_or_default();
    let source = params.arg(1).unwrap_or_default().to_string();

    let code = match verb {
        "add" => {
            let target = params.arg(2).unwrap_or_default().to_string();
            match ctx
                .engine
                .registry_mut()
                .register_alias(kind.clone(), &source, &target)
            {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("alias: {}", e);
                    1
                }
            }
        }
        _ => {
            ctx.engine.registry_mut().remove_alias(&kind, &source);
            0
        }
    };

    if code == 0 {
        if let Some(path) = ctx.engine.alias_store() {
            if let Err(e) = ctx.engine.registry().save_aliases(&path) {
                eprintln!("alias: cannot save {}: {}", path.display(), e);
            }
        }
    }
    Ok(code)
}

fn sleep_command() -> CommandInfo {
    CommandInfo::new(
        "sleep",
        "Wait for a number of milliseconds",
        vec![shape(vec![ArgumentPart::required("milliseconds")])],
        Arc::new(sleep_exec),
    )
}

fn sleep_exec(params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    let millis: u64 = match params.arg(0).unwrap_or_default().parse() {
        Ok(n) => n,
        Err(_) => {
            eprintln!("sleep: not a duration: {}", params.arg(0).unwrap_or_default());
            return Ok(1);
        }
    };
    ctx.session.cancel.sleep(Duration::from_millis(millis))?;
    Ok(0)
}

fn script_command() -> CommandInfo {
    CommandInfo::new(
        "script",
        "Run a batch script",
        vec![shape(vec![
            ArgumentPart::required("path"),
            ArgumentPart::optional("arguments"),
        ])],
        Arc::new(script_exec),
    )
}

fn script_exec(params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    let path = params.arg(0).unwrap_or_default().to_string();
    let args = params.arguments_list[1..].to_vec();
    script::execute_script(ctx.engine, ctx.session, Path::new(&path), &args)?;
    Ok(0)
}

fn json_command() -> CommandInfo {
    CommandInfo::new(
        "json",
        "Open a JSON document in the editor shell",
        vec![shape(vec![ArgumentPart::required("file")])],
        Arc::new(json_exec),
    )
}

fn json_exec(params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    let file = params.arg(0).unwrap_or_default().to_string();
    match ctx
        .engine
        .enter_shell(&ShellKind::Json, &file, &mut *ctx.input)
    {
        Ok(LoopExit::Shutdown) => {
            ctx.session.request_shutdown();
            Ok(0)
        }
        Ok(LoopExit::Popped) => Ok(0),
        Err(e) => Err(e.into()),
    }
}
