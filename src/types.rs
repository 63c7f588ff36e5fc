use std::fmt;
use std::io;

use nix::errno::Errno;
use thiserror::Error;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// Syntax errors and illegal `exit` operands, as dash reports them.
pub const EXIT_USAGE: i32 = 2;
/// A redirection target couldn't be opened; the command never ran.
pub const EXIT_REDIRECT_FAILED: i32 = 2;
pub const EXIT_CANNOT_EXECUTE: i32 = 126;
pub const EXIT_NOT_FOUND: i32 = 127;
pub const EXIT_SIGNAL_BASE: i32 = 128;
/// Reported when reaping a child fails and no real status exists.
pub const EXIT_WAIT_FAILED: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStage {
    Pipe,
    Fork,
}

impl fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchStage::Pipe => write!(f, "pipe"),
            LaunchStage::Fork => write!(f, "fork"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Syntax error: {0}")]
    Syntax(String),
    #[error("{0}: not found")]
    CommandNotFound(String),
    #[error("{command}: {stage} failed: {}", .source.desc())]
    Launch {
        command: String,
        stage: LaunchStage,
        source: Errno,
    },
    #[error("{0}: argument contains a NUL byte")]
    NulByte(String),
    #[error("cannot open {path}: {}", describe(.source))]
    Redirect { path: String, source: io::Error },
    #[error("{0}: bad variable name")]
    InvalidName(String),
    #[error("{0}")]
    Env(String),
    #[error("cd: can't cd to {dir}")]
    ChangeDir { dir: String, source: io::Error },
    #[error("exit: Illegal number: {0}")]
    IllegalNumber(String),
    #[error("waitpid({pid}) failed: {}", .source.desc())]
    Wait { pid: i32, source: Errno },
    #[error("I/O error: {}", describe(.0))]
    Io(#[from] io::Error),
}

impl ShellError {
    /// The exit status a failing step reports to the logical evaluator.
    pub fn status(&self) -> i32 {
        match self {
            ShellError::Syntax(_) | ShellError::IllegalNumber(_) | ShellError::ChangeDir { .. } => EXIT_USAGE,
            ShellError::CommandNotFound(_) => EXIT_NOT_FOUND,
            ShellError::NulByte(_) => EXIT_CANNOT_EXECUTE,
            ShellError::Redirect { .. } => EXIT_REDIRECT_FAILED,
            ShellError::Wait { .. } => EXIT_WAIT_FAILED,
            ShellError::Launch { .. }
            | ShellError::InvalidName(_)
            | ShellError::Env(_)
            | ShellError::Io(_) => EXIT_FAILURE,
        }
    }

    /// Failures that end a non-interactive session: the command never ran.
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            ShellError::CommandNotFound(_) | ShellError::Launch { .. } | ShellError::NulByte(_)
        )
    }
}

/// `io::Error` text without the trailing "(os error N)".
pub fn describe(err: &io::Error) -> String {
    let text = err.to_string();
    match text.find(" (os error") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}

pub type ExecuteResult = Result<i32, ShellError>;
