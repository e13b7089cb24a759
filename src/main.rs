use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use kernsh::{builtins, dispatch, script, NullSource, ShellEngine};

mod cli;
mod prompt;
mod rcfile;
mod repl;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let cli = cli::parse_args(&args);

    if cli.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if cli.version {
        return cli::print_version();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("KERNSH_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let engine = Arc::new(ShellEngine::new());
    if let Err(e) = builtins::install(&engine) {
        eprintln!("kernsh: cannot install builtin commands: {}", e);
        return ExitCode::FAILURE;
    }

    if let Some(store) = rcfile::alias_store_path() {
        engine.set_alias_store(store.clone());
        if let Err(e) = engine.registry_mut().load_aliases(&store) {
            eprintln!("Warning: {}", e);
        }
    }

    // Route keyboard breaks to the current session's cancel gate.
    {
        let engine = Arc::clone(&engine);
        if let Err(e) = ctrlc::set_handler(move || engine.interrupt()) {
            eprintln!("Warning: cannot install interrupt handler: {}", e);
        }
    }

    if let Some(command) = cli.command {
        let mut session = engine.main_session();
        let mut input = NullSource;
        let code = dispatch::dispatch_and_report(&engine, &mut session, &mut input, &command);
        return ExitCode::from(code.clamp(0, 255) as u8);
    }

    if let Some(path) = cli.script {
        let session = engine.main_session();
        return match script::execute_script(&engine, &session, Path::new(&path), &cli.script_args)
        {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    if !cli.no_rc {
        rcfile::load_rc(&engine);
    }
    repl::run(&engine)
}
