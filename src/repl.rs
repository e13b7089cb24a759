use std::process::ExitCode;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use kernsh::{LineSource, ReadOutcome, ShellEngine, ShellSession};

use crate::prompt;

/// Interactive line source backed by the rustyline editor.
///
/// Ctrl+C during a blocked read surfaces as `Interrupted`: the session
/// clears its cancel gate and re-prompts. Ctrl+D is end of input and pops
/// the session.
struct RustylineSource<'e> {
    editor: DefaultEditor,
    engine: &'e ShellEngine,
}

impl LineSource for RustylineSource<'_> {
    fn read_line(&mut self, session: &ShellSession) -> ReadOutcome {
        let prompt = {
            // Serialize prompt redraws per shell type against monitor
            // output; the lock is released before the read blocks.
            let lock = self.engine.prompt_lock(&session.kind);
            let _guard = match lock.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            prompt::render(session)
        };

        match self.editor.readline(&prompt) {
            Ok(line) => {
                let _ = self.editor.add_history_entry(line.as_str());
                ReadOutcome::Line(line)
            }
            Err(ReadlineError::Interrupted) => ReadOutcome::Interrupted,
            Err(ReadlineError::Eof) => ReadOutcome::Eof,
            Err(e) => {
                eprintln!("kernsh: read error: {}", e);
                ReadOutcome::Eof
            }
        }
    }
}

/// Run the interactive main shell until shutdown.
pub(crate) fn run(engine: &ShellEngine) -> ExitCode {
    let editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("kernsh: cannot initialize the line editor: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut source = RustylineSource { editor, engine };

    let mut session = engine.main_session();
    engine.run_session(&mut session, &mut source);
    ExitCode::SUCCESS
}
