use std::fs;

use tempfile::{NamedTempFile, TempDir};

use super::{eval, executor, run};
use crate::executor::Control;
use crate::types::EXIT_REDIRECT_FAILED;

#[test]
fn test_redirection_features() {
    let mut executor = executor();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap();

    // `>` truncates
    fs::write(path, "a much longer previous content\n").unwrap();
    run(&mut executor, &format!("echo hello > {}", path));
    assert_eq!(fs::read_to_string(path).unwrap(), "hello\n");

    // `>>` appends
    run(&mut executor, &format!("echo world >> {}", path));
    assert_eq!(fs::read_to_string(path).unwrap(), "hello\nworld\n");

    // `<` feeds stdin
    let output = NamedTempFile::new().unwrap();
    run(&mut executor, &format!("cat < {} > {}", path, output.path().display()));
    assert_eq!(fs::read_to_string(output.path()).unwrap(), "hello\nworld\n");
}

#[test]
fn test_output_file_is_created_with_default_mode() {
    use std::os::unix::fs::PermissionsExt;

    let mut executor = executor();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("new");

    assert_eq!(run(&mut executor, &format!("echo created > {}", path.display())), 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), "created\n");
    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o600, 0o600);
}

#[test]
fn test_later_redirection_wins() {
    let mut executor = executor();
    let dir = TempDir::new().unwrap();
    let second = dir.path().join("second");

    let cmd = format!("echo x > {} > {}", dir.path().join("first").display(), second.display());
    assert_eq!(run(&mut executor, &cmd), 0);
    assert_eq!(fs::read_to_string(&second).unwrap(), "x\n");
}

#[test]
fn test_redirection_failures() {
    let mut executor = executor();

    // Opened in the child: the command never runs, the line goes on.
    assert_eq!(eval(&mut executor, "cat < /nonexistent/hsh/input"), Control::Continue);
    assert_eq!(executor.status(), EXIT_REDIRECT_FAILED);
    assert_eq!(run(&mut executor, "echo hi > /nonexistent/hsh/output"), EXIT_REDIRECT_FAILED);

    // Opened by the shell for a built-in.
    assert_eq!(run(&mut executor, "env < /nonexistent/hsh/input"), EXIT_REDIRECT_FAILED);
    assert_eq!(run(&mut executor, "env > /nonexistent/hsh/output"), EXIT_REDIRECT_FAILED);

    // Distinct from a command that runs and fails.
    assert_eq!(run(&mut executor, "false"), 1);

    // A target that expands to nothing.
    assert_eq!(run(&mut executor, "echo hi > $UNSET_HSH_VAR"), 2);
}

#[test]
fn test_redirection_only_command() {
    let mut executor = executor();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("touched");

    assert_eq!(run(&mut executor, &format!("> {}", path.display())), 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), "");

    let cmd = format!("$UNSET_HSH_VAR >> {}", dir.path().join("also").display());
    assert_eq!(run(&mut executor, &cmd), 0);
    assert!(dir.path().join("also").exists());
}

#[test]
fn test_builtin_output_redirection() {
    let mut executor = executor();
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().display();

    run(&mut executor, &format!("env > {}", path));
    assert_eq!(
        fs::read_to_string(temp_file.path()).unwrap(),
        "PATH=/bin:/usr/bin\nHOME=/\n"
    );

    run(&mut executor, "setenv EXTRA 1");
    run(&mut executor, &format!("env >> {}", path));
    assert_eq!(
        fs::read_to_string(temp_file.path()).unwrap(),
        "PATH=/bin:/usr/bin\nHOME=/\nPATH=/bin:/usr/bin\nHOME=/\nEXTRA=1\n"
    );
}

#[test]
fn test_redirection_target_from_variable() {
    let mut executor = executor();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("var-target");

    run(&mut executor, &format!("setenv OUT {}", path.display()));
    run(&mut executor, "echo via-variable > $OUT");
    assert_eq!(fs::read_to_string(&path).unwrap(), "via-variable\n");
}
