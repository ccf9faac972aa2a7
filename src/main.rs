//! pipesh - A small pipeline shell
//!
//! Usage:
//!   pipesh              Start interactive shell
//!   pipesh -c "line"    Execute a single line
//!   pipesh script       Execute a script file

mod cli;
mod repl;

use pipesh::{logging, Config, Notifications, Shell};
use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let cli = match cli::parse_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("pipesh: {}", e);
            eprintln!("Try 'pipesh --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if cli.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if cli.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = Config::load(cli.config.as_deref());
    logging::init(&config.log, cli.verbosity);
    let mut shell = Shell::new(config);

    let code = if let Some(line) = cli.command {
        cli::execute_command(&mut shell, &line)
    } else if let Some(script) = cli.script {
        cli::execute_script(&mut shell, &script)
    } else {
        // Interactive sessions survive the terminal's signal keys
        match Notifications::install() {
            Ok(notifications) => shell = shell.with_notifications(notifications),
            Err(e) => log::warn!("cannot install signal handlers: {}", e),
        }
        match repl::run_repl(&mut shell) {
            Ok(code) => cli::exit_code(code),
            Err(e) => {
                eprintln!("REPL error: {}", e);
                ExitCode::FAILURE
            }
        }
    };

    if let Err(e) = shell.save_history() {
        eprintln!("pipesh: cannot save history: {}", e);
    }
    code
}
