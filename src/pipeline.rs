use std::fs::File;
use std::io::Write;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::unistd::Pid;
use tracing::debug;

use crate::launcher::{self, ChildSpec};
use crate::types::{ExecuteResult, LaunchStage, ShellError, EXIT_SUCCESS, EXIT_WAIT_FAILED};

/// Read and write ends of one anonymous pipe. Both close on drop.
struct Pipe {
    read: OwnedFd,
    write: OwnedFd,
}

impl Pipe {
    fn new() -> Result<Self, Errno> {
        let mut fds = [0 as RawFd; 2];
        // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
        Errno::result(unsafe { libc::pipe(fds.as_mut_ptr()) })?;
        // SAFETY: both descriptors were just created and are owned by nobody else.
        Ok(unsafe {
            Self {
                read: OwnedFd::from_raw_fd(fds[0]),
                write: OwnedFd::from_raw_fd(fds[1]),
            }
        })
    }
}

/// Runs `stages` connected stdout to stdin and returns the last stage's status.
///
/// All pipes are created before anything forks; if one can't be, nothing
/// runs. Every child that did start is reaped before returning, whatever
/// happened to its siblings.
pub fn run(stages: &[ChildSpec]) -> ExecuteResult {
    let Some(last_spec) = stages.last() else {
        return Ok(EXIT_SUCCESS);
    };
    if stages.len() == 1 {
        return launcher::run(last_spec);
    }

    let pipes = open_pipes(stages.len() - 1, stages[0].name())?;
    let started = spawn_stages(stages, &pipes, false);
    // Readers only see EOF once the parent's copies of the write ends are gone.
    drop(pipes);
    reap(started, stages.len())
}

/// Like [`run`], with one extra stage in front that runs in this process.
///
/// `head` is called once every child is running, with the write end of the
/// pipe feeding the first of `stages`. The write end closes when `head`
/// returns. Nothing in `head` runs if a pipe or a child can't be set up.
pub fn run_with_head<T, F>(head: F, stages: &[ChildSpec]) -> Result<(T, i32), ShellError>
where
    F: FnOnce(&mut dyn Write) -> T,
{
    let command = stages.first().map(ChildSpec::name).unwrap_or_default();
    let mut pipes = open_pipes(stages.len(), command)?;
    let mut started = spawn_stages(stages, &pipes, true);
    if let Some(err) = started.error.take() {
        drop(pipes);
        // The spawn failure is the one worth reporting.
        let _ = reap(started, stages.len());
        return Err(err);
    }

    let first = pipes.remove(0);
    drop(first.read);
    drop(pipes);
    let mut sink = File::from(first.write);
    let value = head(&mut sink);
    drop(sink);

    let status = reap(started, stages.len())?;
    Ok((value, status))
}

/// The children a pipeline managed to start, and why it stopped if it didn't
/// start them all.
struct Started {
    children: Vec<Pid>,
    error: Option<ShellError>,
}

fn open_pipes(count: usize, command: &str) -> Result<Vec<Pipe>, ShellError> {
    (0..count)
        .map(|_| Pipe::new())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| ShellError::Launch {
            command: command.to_string(),
            stage: LaunchStage::Pipe,
            source,
        })
}

/// Forks every stage. With `fed`, `pipes[0]` feeds the first stage from the
/// parent; otherwise the first stage keeps the shell's stdin.
fn spawn_stages(stages: &[ChildSpec], pipes: &[Pipe], fed: bool) -> Started {
    let all_fds: Vec<RawFd> = pipes
        .iter()
        .flat_map(|pipe| [pipe.read.as_raw_fd(), pipe.write.as_raw_fd()])
        .collect();
    let offset = usize::from(fed);

    let mut started = Started {
        children: Vec::with_capacity(stages.len()),
        error: None,
    };
    for (i, spec) in stages.iter().enumerate() {
        let slot = i + offset;
        let stdin = slot.checked_sub(1).map(|prev| pipes[prev].read.as_raw_fd());
        let stdout = pipes.get(slot).map(|pipe| pipe.write.as_raw_fd());
        match launcher::spawn(spec, stdin, stdout, &all_fds) {
            Ok(pid) => started.children.push(pid),
            Err(err) => {
                started.error = Some(err);
                break;
            }
        }
    }
    debug!(stages = stages.len(), started = started.children.len(), "pipeline running");
    started
}

/// Waits for every started child. A spawn failure wins over a wait failure.
fn reap(started: Started, stages: usize) -> ExecuteResult {
    let mut last_status = None;
    let mut wait_error = None;
    for (i, pid) in started.children.iter().enumerate() {
        match launcher::wait(*pid) {
            Ok(status) if i + 1 == stages => last_status = Some(status),
            Ok(_) => {}
            Err(err) => {
                wait_error.get_or_insert(err);
            }
        }
    }

    if let Some(err) = started.error.or(wait_error) {
        return Err(err);
    }
    Ok(last_status.unwrap_or(EXIT_WAIT_FAILED))
}
