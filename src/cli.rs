use std::process::ExitCode;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed command-line arguments
pub(crate) struct CliArgs {
    pub(crate) command: Option<String>,
    pub(crate) script: Option<String>,
    pub(crate) script_args: Vec<String>,
    pub(crate) no_rc: bool,
    pub(crate) help: bool,
    pub(crate) version: bool,
}

/// Parse command-line arguments
pub(crate) fn parse_args(args: &[String]) -> CliArgs {
    let mut cli = CliArgs {
        command: None,
        script: None,
        script_args: Vec::new(),
        no_rc: false,
        help: false,
        version: false,
    };

    let mut i = 1; // Skip program name
    while i < args.len() {
        match args[i].as_str() {
            "-c" => {
                // Everything after -c is the command
                if i + 1 < args.len() {
                    cli.command = Some(args[i + 1..].join(" "));
                }
                break;
            }
            "--norc" => {
                cli.no_rc = true;
            }
            "--help" | "-h" => {
                cli.help = true;
            }
            "--version" | "-V" => {
                cli.version = true;
            }
            path => {
                // A script file; everything after it is the script's own
                // arguments, reachable as {0}, {1}, ...
                if !path.starts_with('-') {
                    cli.script = Some(path.to_string());
                    cli.script_args = args[i + 1..].to_vec();
                }
                break;
            }
        }
        i += 1;
    }

    cli
}

pub(crate) fn print_help() {
    println!(
        r#"kernsh-{} A simulated-kernel command shell

USAGE:
    kernsh                     Start the interactive shell
    kernsh -c <command>        Execute a single command line
    kernsh <script> [args...]  Execute a batch script
    kernsh --norc              Skip ~/.kernshrc at startup
    kernsh --help              Show this help message
    kernsh --version           Show version

SCRIPTS:
    One command per line, same syntax as interactive input. Lines starting
    with '#' or a space are comments. $name tokens are variables; {{0}},
    {{1}}, ... are the script's own arguments. '$name = value' assigns.

ENVIRONMENT:
    KERNSH_LOG                 tracing filter (e.g. debug, kernsh=trace)
"#,
        VERSION
    );
}

pub(crate) fn print_version() -> ExitCode {
    println!("kernsh {}", VERSION);
    ExitCode::SUCCESS
}
