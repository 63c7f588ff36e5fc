use std::io::IsTerminal;
use std::path::Path;

pub const DEFAULT_NAME: &str = "hsh";
pub const LOG_ENV_VAR: &str = "HSH_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOptions {
    /// Prefix for diagnostics, `hsh: 1: foo: not found`.
    pub name: String,
    /// Stdin is a terminal. Scripts stop at the first command that can't launch.
    pub interactive: bool,
    pub log_filter: String,
}

impl ShellOptions {
    pub fn from_process() -> Self {
        let name = std::env::args_os()
            .next()
            .and_then(|arg0| {
                Path::new(&arg0)
                    .file_name()
                    .map(|base| base.to_string_lossy().into_owned())
            })
            .filter(|base| !base.is_empty())
            .unwrap_or_else(|| DEFAULT_NAME.to_string());

        Self {
            name,
            interactive: std::io::stdin().is_terminal(),
            log_filter: std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn non_interactive(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interactive: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self::non_interactive(DEFAULT_NAME)
    }
}
