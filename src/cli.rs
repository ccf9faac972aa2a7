use pipesh::{Flow, Shell};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed command-line arguments
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CliArgs {
    pub(crate) command: Option<String>,
    pub(crate) script: Option<String>,
    pub(crate) config: Option<PathBuf>,
    pub(crate) verbosity: u8,
    pub(crate) help: bool,
    pub(crate) version: bool,
}

/// Parse command-line arguments
pub(crate) fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut cli = CliArgs::default();

    let mut i = 1; // Skip program name
    while i < args.len() {
        match args[i].as_str() {
            "-c" => {
                // Everything after -c is the command
                if i + 1 < args.len() {
                    cli.command = Some(args[i + 1..].join(" "));
                    break;
                }
                return Err("-c: option requires an argument".into());
            }
            "--config" => {
                i += 1;
                let path = args
                    .get(i)
                    .ok_or_else(|| "--config: option requires an argument".to_string())?;
                cli.config = Some(PathBuf::from(path));
            }
            "--verbose" => {
                cli.verbosity = cli.verbosity.saturating_add(1);
            }
            "--help" | "-h" => {
                cli.help = true;
            }
            "--version" | "-V" => {
                cli.version = true;
            }
            flag if is_verbosity_flag(flag) => {
                cli.verbosity = cli.verbosity.saturating_add((flag.len() - 1) as u8);
            }
            flag if flag.starts_with('-') => {
                return Err(format!("{}: unknown option", flag));
            }
            path => {
                // The first plain argument is a script; later ones are ignored
                if cli.script.is_none() {
                    cli.script = Some(path.to_string());
                }
            }
        }
        i += 1;
    }

    Ok(cli)
}

/// `-v`, `-vv`, `-vvv` and so on
fn is_verbosity_flag(flag: &str) -> bool {
    flag.strip_prefix('-')
        .is_some_and(|vs| !vs.is_empty() && vs.chars().all(|c| c == 'v'))
}

pub(crate) fn print_help() {
    println!(
        r#"pipesh {} - A small pipeline shell

USAGE:
    pipesh                  Start interactive shell
    pipesh -c <line>        Execute a single line
    pipesh <script>         Execute each line of a script file
    pipesh --help           Show this help message
    pipesh --version        Show version

OPTIONS:
    -v, -vv, -vvv           Log at info, debug or trace level
    --config <path>         Read configuration from <path>

CONFIG:
    $PIPESH_CONFIG          Configuration file, takes precedence over --config
    ~/.config/pipesh/config.toml
                            Used when neither of the above is given

SYNTAX:
    cmd1 | cmd2             Pipe cmd1's output into cmd2
    cmd1 & cmd2             Run cmd1 in the background
    cmd1 ; cmd2             Run cmd1, then cmd2
    < file                  Read standard input from file
    > file                  Write standard output to file
    2> file                 Write standard error to file
    *.txt  file?.log        Wildcards, expanded against the filesystem

    Operators must be separated from words by whitespace.

HISTORY:
    history                 List retained lines
    !N                      Replay line N
    !text                   Replay the latest line starting with text
    !                       Replay the latest line

BUILTINS:
    cd [dir]                Change directory (default $HOME)
    pwd                     Print the current directory
    prompt [text]           Set the prompt (no text restores the default)
    jobs                    List running background jobs
    exit [code]             Leave the shell"#,
        VERSION
    );
}

pub(crate) fn print_version() {
    println!("pipesh {}", VERSION);
}

/// Map a shell status to a process exit code
pub(crate) fn exit_code(code: i32) -> ExitCode {
    ExitCode::from((code & 0xff) as u8)
}

/// Execute a single line
pub(crate) fn execute_command(shell: &mut Shell, line: &str) -> ExitCode {
    match shell.execute(line) {
        Ok(Flow::Continue(status)) => exit_code(status.code()),
        Ok(Flow::Exit(code)) => exit_code(code),
        Err(e) => {
            eprintln!("pipesh: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Execute a script file line by line
pub(crate) fn execute_script(shell: &mut Shell, path: &str) -> ExitCode {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("pipesh: {}: {}", path, e);
            return ExitCode::from(127);
        }
    };

    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        // Skip empty lines and comments
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        shell.notify_finished();
        match shell.submit(trimmed) {
            Ok(Flow::Continue(_)) => {}
            Ok(Flow::Exit(code)) => return exit_code(code),
            Err(e) => {
                eprintln!("pipesh: {}: line {}: {}", path, line_num + 1, e);
            }
        }
    }

    exit_code(shell.last_status().code())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        std::iter::once("pipesh")
            .chain(words.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn no_arguments_is_interactive() {
        assert_eq!(parse_args(&args(&[])).unwrap(), CliArgs::default());
    }

    #[test]
    fn command_takes_the_rest() {
        let cli = parse_args(&args(&["-v", "-c", "echo", "a", "|", "wc", "-v"])).unwrap();
        assert_eq!(cli.command.as_deref(), Some("echo a | wc -v"));
        assert_eq!(cli.verbosity, 1);
    }

    #[test]
    fn command_needs_a_line() {
        assert!(parse_args(&args(&["-c"])).is_err());
    }

    #[test]
    fn verbosity_counts() {
        assert_eq!(parse_args(&args(&["-vv", "-v"])).unwrap().verbosity, 3);
        assert_eq!(parse_args(&args(&["--verbose"])).unwrap().verbosity, 1);
    }

    #[test]
    fn config_path() {
        let cli = parse_args(&args(&["--config", "/etc/pipesh.toml", "run.sh"])).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/pipesh.toml")));
        assert_eq!(cli.script.as_deref(), Some("run.sh"));
        assert!(parse_args(&args(&["--config"])).is_err());
    }

    #[test]
    fn unknown_flag_rejected() {
        assert!(parse_args(&args(&["--frobnicate"])).is_err());
    }
}
