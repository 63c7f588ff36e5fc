mod lexer_tests;
mod redirection_tests;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::{
    config::ShellOptions,
    env::Environment,
    executor::{Control, Executor},
};

/// A non-interactive shell over a small, fixed environment.
pub(crate) fn executor() -> Executor {
    let env: Environment = [("PATH", "/bin:/usr/bin"), ("HOME", "/")].into_iter().collect();
    Executor::new(ShellOptions::non_interactive("hsh"), env)
}

/// Runs one line and returns the resulting `$?`.
pub(crate) fn run(executor: &mut Executor, line: &str) -> i32 {
    executor.eval_line(line);
    executor.status()
}

pub(crate) fn eval(executor: &mut Executor, line: &str) -> Control {
    executor.eval_line(line)
}

pub(crate) fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
