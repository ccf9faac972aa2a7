use pipesh::signals::CAUGHT_NOTICE;
use pipesh::{Flow, Shell};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};

/// Read and run lines until end of input or `exit`, returning the exit code
pub(crate) fn run_repl(shell: &mut Shell) -> RlResult<i32> {
    let mut rl = DefaultEditor::new()?;

    // Seed line editing history with whatever the shell loaded
    for entry in shell.history().entries() {
        let _ = rl.add_history_entry(entry.line.as_str());
    }

    let code = loop {
        // Announce background jobs that finished since the last prompt
        shell.notify_finished();

        let prompt = shell.prompt().to_string();
        match rl.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                match shell.submit(&line) {
                    Ok(Flow::Continue(_)) => {}
                    Ok(Flow::Exit(code)) => break code,
                    Err(e) => eprintln!("pipesh: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C at the prompt never ends the shell
                eprintln!("{}", CAUGHT_NOTICE);
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                break shell.last_status().code();
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break 1;
            }
        }
    };

    println!("Exiting the shell.");
    Ok(code)
}
