use std::path::{Path, PathBuf};

use nix::unistd::{access, AccessFlags};
use tracing::debug;

use crate::env::Environment;
use crate::types::ShellError;

/// Maps a command name to the file to execute.
///
/// Names containing a `/` are used as-is; bare names are looked up in the
/// `PATH` held by `env`, first match wins.
pub fn resolve(name: &str, env: &Environment) -> Result<PathBuf, ShellError> {
    let found = if name.contains('/') {
        let path = Path::new(name);
        is_executable(path).then(|| path.to_path_buf())
    } else {
        env.get("PATH").and_then(|paths| search_path(name, paths))
    };

    debug!(name, resolved = ?found, "resolve");

    found.ok_or_else(|| ShellError::CommandNotFound(name.to_string()))
}

pub fn search_path(cmd: &str, paths: &str) -> Option<PathBuf> {
    paths
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(cmd))
        .find(|candidate| is_executable(candidate))
}

pub fn is_executable(path: &Path) -> bool {
    let is_file = path.metadata().map(|meta| meta.is_file()).unwrap_or(false);
    is_file && access(path, AccessFlags::X_OK).is_ok()
}
