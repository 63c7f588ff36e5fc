use std::io::{self, BufRead};
use std::process::exit;

use anyhow::{Context, Result};
use hsh::{Control, Environment, Executor, ShellOptions};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "$ ";

fn main() -> Result<()> {
    let options = ShellOptions::from_process();
    init_logging(&options);
    debug!(?options, "starting");

    let interactive = options.interactive;
    let mut executor = Executor::new(options, Environment::from_process());
    let code = if interactive {
        run_interactive(&mut executor)?
    } else {
        run_script(&mut executor, io::stdin().lock())?
    };

    // Release the environment before leaving; `exit` skips destructors.
    drop(executor);
    exit(code);
}

fn init_logging(options: &ShellOptions) {
    let filter = EnvFilter::try_new(&options.log_filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_interactive(executor: &mut Executor) -> Result<i32> {
    let mut editor = DefaultEditor::new().context("failed to start line editor")?;
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if let Control::Exit(code) = executor.eval_line(&line) {
                    return Ok(code);
                }
            }
            // Ctrl-C drops the line being typed.
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return Ok(executor.status()),
            Err(err) => return Err(err).context("failed to read input"),
        }
    }
}

fn run_script<R: BufRead>(executor: &mut Executor, mut input: R) -> Result<i32> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).context("failed to read input")? == 0 {
            return Ok(executor.status());
        }
        let line = String::from_utf8_lossy(&buf);
        if let Control::Exit(code) = executor.eval_line(&line) {
            return Ok(code);
        }
    }
}
