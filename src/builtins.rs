use std::io::Write;

use crate::env::Environment;
use crate::types::{ShellError, EXIT_SUCCESS};

pub const BUILTINS: [&str; 6] = ["cd", "env", "setenv", "unsetenv", "exit", "quit"];

/// What the evaluator does after a built-in returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue(i32),
    /// Stop evaluating and end the shell with this code.
    Exit(i32),
}

pub fn is_builtin(cmd: &str) -> bool {
    BUILTINS.contains(&cmd)
}

/// Runs the built-in named by `argv[0]` in the current process.
pub fn execute_builtin(argv: &[String], env: &mut Environment, out: &mut dyn Write) -> Result<Flow, ShellError> {
    let Some((name, args)) = argv.split_first() else {
        return Ok(Flow::Continue(EXIT_SUCCESS));
    };

    match name.as_str() {
        "exit" | "quit" => exit_code(args).map(Flow::Exit),
        "env" => {
            for entry in env.snapshot() {
                writeln!(out, "{}", entry)?;
            }
            out.flush()?;
            Ok(Flow::Continue(EXIT_SUCCESS))
        }
        "setenv" => {
            let [name, value] = args else {
                return Err(ShellError::Env("setenv: usage: setenv NAME VALUE".to_string()));
            };
            env.set(name, value, true)?;
            Ok(Flow::Continue(EXIT_SUCCESS))
        }
        "unsetenv" => {
            let [name] = args else {
                return Err(ShellError::Env("unsetenv: usage: unsetenv NAME".to_string()));
            };
            env.unset(name);
            Ok(Flow::Continue(EXIT_SUCCESS))
        }
        "cd" => change_dir(args, env, out),
        _ => Err(ShellError::CommandNotFound(name.clone())),
    }
}

/// `exit` operand to a process status. Operands wrap modulo 256.
fn exit_code(args: &[String]) -> Result<i32, ShellError> {
    match args.first() {
        None => Ok(EXIT_SUCCESS),
        Some(arg) if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) => {
            let code = arg
                .bytes()
                .fold(0u32, |acc, b| (acc * 10 + u32::from(b - b'0')) % 256);
            Ok(code as i32)
        }
        Some(arg) => Err(ShellError::IllegalNumber(arg.clone())),
    }
}

fn change_dir(args: &[String], env: &mut Environment, out: &mut dyn Write) -> Result<Flow, ShellError> {
    if args.len() > 1 {
        return Err(ShellError::Env("cd: too many arguments".to_string()));
    }
    let (target, announce) = match args.first().map(String::as_str) {
        None | Some("~") => (lookup(env, "HOME")?, false),
        Some("-") => (lookup(env, "OLDPWD")?, true),
        Some(dir) => (dir.to_string(), false),
    };

    let previous = current_dir().or_else(|| env.get("PWD").map(str::to_string)).unwrap_or_default();
    std::env::set_current_dir(&target).map_err(|source| ShellError::ChangeDir {
        dir: target.clone(),
        source,
    })?;
    let current = current_dir().unwrap_or_else(|| target.clone());

    // OLDPWD first, then PWD.
    env.set("OLDPWD", &previous, true)?;
    env.set("PWD", &current, true)?;

    if announce {
        writeln!(out, "{}", current)?;
        out.flush()?;
    }
    Ok(Flow::Continue(EXIT_SUCCESS))
}

fn lookup(env: &Environment, name: &str) -> Result<String, ShellError> {
    env.get(name)
        .map(str::to_string)
        .ok_or_else(|| ShellError::Env(format!("cd: {} not set", name)))
}

fn current_dir() -> Option<String> {
    std::env::current_dir()
        .ok()
        .map(|dir| dir.to_string_lossy().into_owned())
}
