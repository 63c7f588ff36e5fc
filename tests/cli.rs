use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Feeds `script` to the shell on a pipe, so it runs non-interactively.
fn run_script(script: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_hsh"))
        .env_clear()
        .env("PATH", "/bin:/usr/bin")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_exit_code_is_the_process_status() {
    let output = run_script("echo hi\nexit 7\necho never\n");
    assert_eq!(output.status.code(), Some(7));
    assert_eq!(stdout(&output), "hi\n");
}

#[test]
fn test_illegal_exit_number() {
    let output = run_script("exit abc\n");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stderr(&output), "hsh: 1: exit: Illegal number: abc\n");
}

#[test]
fn test_end_of_input_exits_with_last_status() {
    assert_eq!(run_script("true\nfalse\n").status.code(), Some(1));
    assert_eq!(run_script("false\ntrue").status.code(), Some(0));
    assert_eq!(run_script("").status.code(), Some(0));
}

#[test]
fn test_command_not_found_ends_the_script() {
    let output = run_script("echo first\nnosuch_command_hsh_test\necho after\n");
    assert_eq!(output.status.code(), Some(127));
    assert_eq!(stdout(&output), "first\n");
    assert_eq!(stderr(&output), "hsh: 2: nosuch_command_hsh_test: not found\n");
}

#[test]
fn test_syntax_error_reports_line_and_continues() {
    let output = run_script("true\n| cat\necho ok\n");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "ok\n");
    assert_eq!(stderr(&output), "hsh: 2: Syntax error: \"|\" unexpected\n");
}

#[test]
fn test_operators_and_expansion_end_to_end() {
    let output = run_script("setenv NAME world\necho hello $NAME | tr a-z A-Z\nfalse || echo $?\nfalse && echo no ; echo yes\n");
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "HELLO WORLD\n1\nyes\n");
}

#[test]
fn test_env_lists_the_private_table() {
    let output = run_script("setenv A 1\nunsetenv PATH\nenv\n");
    assert_eq!(stdout(&output), "A=1\n");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_cd_errors_are_reported() {
    let output = run_script("cd /nonexistent/hsh/dir\n");
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stderr(&output), "hsh: 1: cd: can't cd to /nonexistent/hsh/dir\n");
}

#[test]
fn test_exit_at_the_head_of_a_pipeline() {
    let output = run_script("exit 9 | cat\necho never\n");
    assert_eq!(output.status.code(), Some(9));
    assert_eq!(stdout(&output), "");
}
