use kernsh::ShellSession;

/// Expand a session's prompt preset.
///
/// Recognized placeholders: `{user}`, `{host}`, `{path}`, `{kind}`,
/// `{time}`, `{date}`.
pub(crate) fn render(session: &ShellSession) -> String {
    let preset = if session.prompt_preset.is_empty() {
        "{kind}> "
    } else {
        session.prompt_preset.as_str()
    };

    let now = chrono::Local::now();
    preset
        .replace("{user}", &std::env::var("USER").unwrap_or_default())
        .replace("{host}", &host_name())
        .replace("{path}", &session.working_path)
        .replace("{kind}", &session.kind.to_string())
        .replace("{time}", &now.format("%H:%M:%S").to_string())
        .replace("{date}", &now.format("%Y-%m-%d").to_string())
}

fn host_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_default()
}
