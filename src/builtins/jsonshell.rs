//! The JSON editor sub-shell.
//!
//! `json <file>` from the main shell pushes a session of this kind. The
//! document lives in the session (parsed lazily from the working path) so
//! edits accumulate until `save` writes them back.

use std::sync::Arc;

use serde_json::Value;

use crate::args::{ArgumentPart, ArgumentShape};
use crate::command::{CommandInfo, CommandParameters, ExecContext, ExecError};
use crate::engine::{EngineError, ShellEngine};
use crate::session::{ShellKind, ShellRegistration, ShellSession};

/// Session variable holding the working copy of the document.
const DOC_VAR: &str = "__document";

pub(super) fn install(engine: &ShellEngine) -> Result<(), EngineError> {
    engine.register_shell(ShellRegistration::new(
        ShellKind::Json,
        "[json {path}] > ",
        Arc::new(json_factory),
        commands(),
    ))
}

fn json_factory(arg: &str) -> ShellSession {
    ShellSession::new(ShellKind::Json).with_working_path(arg)
}

fn commands() -> Vec<CommandInfo> {
    vec![
        print_command(),
        get_command(),
        set_command(),
        save_command(),
    ]
}

fn shape(parts: Vec<ArgumentPart>) -> ArgumentShape {
    ArgumentShape::of(parts).unwrap_or_else(|_| ArgumentShape::none())
}

/// Parse the session's working copy, loading it from disk on first use.
/// A missing file starts as an empty object.
fn load_document(session: &mut ShellSession) -> Result<Value, ExecError> {
    if let Some(text) = session.vars.get(DOC_VAR) {
        return Ok(serde_json::from_str(text)?);
    }
    let text = match std::fs::read_to_string(&session.working_path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => "{}".to_string(),
        Err(e) => return Err(e.into()),
    };
    let value: Value = serde_json::from_str(&text)?;
    session
        .vars
        .insert(DOC_VAR.to_string(), serde_json::to_string_pretty(&value)?);
    Ok(value)
}

fn store_document(session: &mut ShellSession, value: &Value) -> Result<(), ExecError> {
    session
        .vars
        .insert(DOC_VAR.to_string(), serde_json::to_string_pretty(value)?);
    Ok(())
}

fn normalize_pointer(pointer: &str) -> String {
    if pointer.is_empty() || pointer == "/" {
        String::new()
    } else if pointer.starts_with('/') {
        pointer.to_string()
    } else {
        format!("/{}", pointer)
    }
}

fn print_command() -> CommandInfo {
    CommandInfo::new(
        "print",
        "Show the whole document",
        vec![ArgumentShape::none()],
        Arc::new(print_exec),
    )
}

fn print_exec(_params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    let doc = load_document(ctx.session)?;
    ctx.write_line(&serde_json::to_string_pretty(&doc)?)?;
    Ok(0)
}

fn get_command() -> CommandInfo {
    CommandInfo::new(
        "get",
        "Show the value at a JSON pointer",
        vec![shape(vec![ArgumentPart::required("pointer")])],
        Arc::new(get_exec),
    )
}

fn get_exec(params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    let pointer = normalize_pointer(params.arg(0).unwrap_or_default());
    let doc = load_document(ctx.session)?;
    match doc.pointer(&pointer) {
        Some(value) => {
            ctx.write_line(&serde_json::to_string(value)?)?;
            Ok(0)
        }
        None => {
            eprintln!("get: no value at {}", params.arg(0).unwrap_or_default());
            Ok(1)
        }
    }
}

fn set_command() -> CommandInfo {
    CommandInfo::new(
        "set",
        "Set the value at a JSON pointer",
        vec![shape(vec![
            ArgumentPart::required("pointer"),
            ArgumentPart::required("value"),
        ])],
        Arc::new(set_exec),
    )
}

fn set_exec(params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    let pointer = normalize_pointer(params.arg(0).unwrap_or_default());
    let raw = params.arg(1).unwrap_or_default();
    // Bare words become strings; anything that parses as JSON is kept as is.
    let value: Value = serde_json::from_str(raw).unwrap_or(Value::String(raw.to_string()));

    let mut doc = load_document(ctx.session)?;
    if !insert_at(&mut doc, &pointer, value) {
        eprintln!("set: no such location: {}", params.arg(0).unwrap_or_default());
        return Ok(1);
    }
    store_document(ctx.session, &doc)?;
    Ok(0)
}

/// Replace the value at `pointer`, or create it under an existing parent
/// object (or by appending to an existing parent array).
fn insert_at(doc: &mut Value, pointer: &str, value: Value) -> bool {
    if pointer.is_empty() {
        *doc = value;
        return true;
    }
    if let Some(slot) = doc.pointer_mut(pointer) {
        *slot = value;
        return true;
    }
    let (parent, key) = match pointer.rfind('/') {
        Some(pos) => (&pointer[..pos], &pointer[pos + 1..]),
        None => return false,
    };
    match doc.pointer_mut(parent) {
        Some(Value::Object(map)) => {
            map.insert(key.replace("~1", "/").replace("~0", "~"), value);
            true
        }
        Some(Value::Array(items)) => {
            if key == "-" || key.parse::<usize>() == Ok(items.len()) {
                items.push(value);
                true
            } else {
                false
            }
        }
        _ => false,
    }
}

fn save_command() -> CommandInfo {
    CommandInfo::new(
        "save",
        "Write the document back to its file",
        vec![ArgumentShape::none()],
        Arc::new(save_exec),
    )
}

fn save_exec(_params: &CommandParameters, ctx: &mut ExecContext<'_>) -> Result<i32, ExecError> {
    let doc = load_document(ctx.session)?;
    let text = serde_json::to_string_pretty(&doc)?;
    std::fs::write(&ctx.session.working_path, text)?;
    ctx.write_line(&format!("Saved {}", ctx.session.working_path))?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_replaces_existing_value() {
        let mut doc = json!({"a": {"b": 1}});
        assert!(insert_at(&mut doc, "/a/b", json!(2)));
        assert_eq!(doc, json!({"a": {"b": 2}}));
    }

    #[test]
    fn insert_creates_key_under_existing_object() {
        let mut doc = json!({"a": {}});
        assert!(insert_at(&mut doc, "/a/new", json!("x")));
        assert_eq!(doc, json!({"a": {"new": "x"}}));
    }

    #[test]
    fn insert_appends_to_array() {
        let mut doc = json!({"list": [1, 2]});
        assert!(insert_at(&mut doc, "/list/2", json!(3)));
        assert!(insert_at(&mut doc, "/list/-", json!(4)));
        assert_eq!(doc, json!({"list": [1, 2, 3, 4]}));
    }

    #[test]
    fn insert_rejects_missing_parent() {
        let mut doc = json!({});
        assert!(!insert_at(&mut doc, "/a/b/c", json!(1)));
    }
}
