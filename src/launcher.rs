//! Forks and execs one command, wiring its standard streams first.

use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::Write;
use std::mem::ManuallyDrop;
use std::os::fd::{FromRawFd, RawFd};
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::{open, OFlag};
use nix::libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, execve, fork, ForkResult, Pid};
use tracing::{debug, trace};

use crate::ast::{Invocation, RedirectMode};
use crate::builtins::{self, Flow};
use crate::env::Environment;
use crate::types::{
    ExecuteResult, LaunchStage, ShellError, EXIT_CANNOT_EXECUTE, EXIT_FAILURE, EXIT_NOT_FOUND,
    EXIT_REDIRECT_FAILED, EXIT_SIGNAL_BASE, EXIT_SUCCESS,
};

/// What the child does once its streams are in place.
#[derive(Debug)]
pub enum ChildProgram {
    Exec(CString),
    /// A built-in in a later pipeline stage, against its own copy of the table.
    Builtin(Environment),
    /// The name didn't resolve; the child reports it and exits 127.
    Missing,
    /// Every word expanded away; only the redirections happen.
    Noop,
}

/// Everything a child needs, prepared before `fork`.
#[derive(Debug)]
pub struct ChildSpec {
    name: String,
    program: ChildProgram,
    args: Vec<String>,
    argv: Vec<CString>,
    envp: Vec<CString>,
    input: Option<CString>,
    output: Option<(CString, RedirectMode)>,
    diag_prefix: String,
}

impl ChildSpec {
    pub fn external(
        path: &Path,
        invocation: &Invocation,
        env: &Environment,
        diag_prefix: &str,
    ) -> Result<Self, ShellError> {
        let name = invocation.name().unwrap_or_default();
        let program = to_cstring(&path.to_string_lossy(), name)?;
        let mut spec = Self::new(ChildProgram::Exec(program), invocation, diag_prefix)?;
        spec.argv = invocation
            .argv
            .iter()
            .map(|arg| to_cstring(arg, name))
            .collect::<Result<_, _>>()?;
        spec.envp = env.to_envp();
        Ok(spec)
    }

    pub fn builtin(invocation: &Invocation, env: &Environment, diag_prefix: &str) -> Result<Self, ShellError> {
        Self::new(ChildProgram::Builtin(env.clone()), invocation, diag_prefix)
    }

    pub fn missing(invocation: &Invocation, diag_prefix: &str) -> Result<Self, ShellError> {
        Self::new(ChildProgram::Missing, invocation, diag_prefix)
    }

    pub fn noop(invocation: &Invocation, diag_prefix: &str) -> Result<Self, ShellError> {
        Self::new(ChildProgram::Noop, invocation, diag_prefix)
    }

    fn new(program: ChildProgram, invocation: &Invocation, diag_prefix: &str) -> Result<Self, ShellError> {
        let name = invocation.name().unwrap_or_default().to_string();
        let redirections = &invocation.redirections;
        let input = match &redirections.input {
            Some(path) => Some(to_cstring(path, &name)?),
            None => None,
        };
        let output = match &redirections.output {
            Some((path, mode)) => Some((to_cstring(path, &name)?, *mode)),
            None => None,
        };
        Ok(Self {
            name,
            program,
            args: invocation.argv.clone(),
            argv: Vec::new(),
            envp: Vec::new(),
            input,
            output,
            diag_prefix: diag_prefix.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `status`, reaped from this child, means the program itself
    /// never got to run: its name didn't resolve or `execve` refused it.
    pub fn never_started(&self, status: i32) -> bool {
        match self.program {
            ChildProgram::Missing => true,
            ChildProgram::Exec(_) => status == EXIT_CANNOT_EXECUTE || status == EXIT_NOT_FOUND,
            ChildProgram::Builtin(_) | ChildProgram::Noop => false,
        }
    }

    /// Diagnostic from inside the child, straight to fd 2.
    fn report(&self, parts: &[&[u8]]) {
        let mut message = self.diag_prefix.as_bytes().to_vec();
        for part in parts {
            message.extend_from_slice(part);
        }
        message.push(b'\n');
        let _ = raw_stream(STDERR_FILENO).write_all(&message);
    }
}

fn to_cstring(value: &str, command: &str) -> Result<CString, ShellError> {
    CString::new(value).map_err(|_| ShellError::NulByte(command.to_string()))
}

/// Runs a single command with no pipe plumbing and waits for it.
pub fn run(spec: &ChildSpec) -> ExecuteResult {
    let pid = spawn(spec, None, None, &[])?;
    wait(pid)
}

/// Forks a child for `spec`. `stdin`/`stdout` are moved onto fds 0 and 1;
/// every descriptor in `inherited` is closed in the child before it execs.
pub fn spawn(
    spec: &ChildSpec,
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
    inherited: &[RawFd],
) -> Result<Pid, ShellError> {
    // SAFETY: the child only rewires descriptors, then execs or `_exit`s.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            debug!(pid = child.as_raw(), command = %spec.name, "spawned");
            Ok(child)
        }
        Ok(ForkResult::Child) => run_child(spec, stdin, stdout, inherited),
        Err(source) => Err(ShellError::Launch {
            command: spec.name.clone(),
            stage: LaunchStage::Fork,
            source,
        }),
    }
}

/// Blocks until `pid` terminates and maps how it ended to an exit status.
pub fn wait(pid: Pid) -> ExecuteResult {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => {
                trace!(pid = pid.as_raw(), code, "reaped");
                return Ok(code);
            }
            Ok(WaitStatus::Signaled(_, signal, _)) => {
                debug!(pid = pid.as_raw(), ?signal, "killed by signal");
                return Ok(EXIT_SIGNAL_BASE + signal as i32);
            }
            Ok(other) => trace!(?other, "still waiting"),
            Err(Errno::EINTR) => continue,
            Err(source) => {
                return Err(ShellError::Wait {
                    pid: pid.as_raw(),
                    source,
                })
            }
        }
    }
}

fn run_child(spec: &ChildSpec, stdin: Option<RawFd>, stdout: Option<RawFd>, inherited: &[RawFd]) -> ! {
    // The Rust runtime ignores SIGPIPE, and an ignored signal survives execve.
    let sigdfl = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    // SAFETY: restoring the default disposition installs no handler.
    let _ = unsafe { sigaction(Signal::SIGPIPE, &sigdfl) };

    for (fd, target) in [(stdin, STDIN_FILENO), (stdout, STDOUT_FILENO)] {
        if let Some(fd) = fd {
            if fd != target {
                if let Err(errno) = dup2(fd, target) {
                    spec.report(&[b"dup2: ", errno.desc().as_bytes()]);
                    child_exit(EXIT_FAILURE);
                }
            }
        }
    }
    for &fd in inherited {
        if fd > STDERR_FILENO {
            let _ = close(fd);
        }
    }

    if let Some(path) = &spec.input {
        redirect(spec, path, OFlag::O_RDONLY, STDIN_FILENO);
    }
    if let Some((path, mode)) = &spec.output {
        let flags = OFlag::O_WRONLY
            | OFlag::O_CREAT
            | match mode {
                RedirectMode::Append => OFlag::O_APPEND,
                _ => OFlag::O_TRUNC,
            };
        redirect(spec, path, flags, STDOUT_FILENO);
    }

    match &spec.program {
        ChildProgram::Exec(path) => {
            let errno = match execve(path, &spec.argv, &spec.envp) {
                Ok(never) => match never {},
                Err(errno) => errno,
            };
            spec.report(&[path.to_bytes(), b": ", errno.desc().as_bytes()]);
            child_exit(if errno == Errno::ENOENT {
                EXIT_NOT_FOUND
            } else {
                EXIT_CANNOT_EXECUTE
            })
        }
        ChildProgram::Missing => {
            spec.report(&[spec.name.as_bytes(), b": not found"]);
            child_exit(EXIT_NOT_FOUND)
        }
        ChildProgram::Noop => child_exit(EXIT_SUCCESS),
        ChildProgram::Builtin(env) => {
            let mut env = env.clone();
            let mut out = raw_stream(STDOUT_FILENO);
            let status = match builtins::execute_builtin(&spec.args, &mut env, &mut *out) {
                Ok(Flow::Continue(status)) | Ok(Flow::Exit(status)) => status,
                Err(err) => {
                    spec.report(&[err.to_string().as_bytes()]);
                    err.status()
                }
            };
            child_exit(status)
        }
    }
}

/// Opens `path` onto `target`, or ends the child with a failure status.
fn redirect(spec: &ChildSpec, path: &CStr, flags: OFlag, target: RawFd) {
    let fd = match open(path, flags, Mode::from_bits_truncate(0o644)) {
        Ok(fd) => fd,
        Err(errno) => {
            spec.report(&[b"cannot open ", path.to_bytes(), b": ", errno.desc().as_bytes()]);
            child_exit(EXIT_REDIRECT_FAILED);
        }
    };
    if fd != target {
        let moved = dup2(fd, target);
        let _ = close(fd);
        if let Err(errno) = moved {
            spec.report(&[b"dup2: ", errno.desc().as_bytes()]);
            child_exit(EXIT_REDIRECT_FAILED);
        }
    }
}

/// A `File` over an fd the child doesn't own; dropping it leaves the fd open.
fn raw_stream(fd: RawFd) -> ManuallyDrop<File> {
    // SAFETY: fds 1 and 2 stay open for the life of the child.
    ManuallyDrop::new(unsafe { File::from_raw_fd(fd) })
}

fn child_exit(code: i32) -> ! {
    // SAFETY: `_exit` skips the parent's atexit handlers and buffered stdio.
    unsafe { libc::_exit(code) }
}
