use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};

use tracing::debug;

use crate::ast::{Chain, CommandLine, Invocation, LogicalOp, Pipeline, RedirectMode, Redirections};
use crate::builtins::{execute_builtin, is_builtin, Flow};
use crate::config::ShellOptions;
use crate::env::Environment;
use crate::expand::expand_command;
use crate::launcher::{self, ChildSpec};
use crate::lexer::lex;
use crate::parser::parse;
use crate::path;
use crate::pipeline;
use crate::types::{ExecuteResult, ShellError, EXIT_SUCCESS};

/// What the read loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit(i32),
}

/// Evaluates parsed lines against the shell's environment.
///
/// Strictly sequential: a pipeline never starts before the previous one's
/// status is known. Errors never escape a step; each one is reported and
/// turned into that step's exit status.
pub struct Executor {
    options: ShellOptions,
    env: Environment,
    status: i32,
    line: usize,
    exit_code: Option<i32>,
    launch_failed: bool,
}

impl Executor {
    pub fn new(options: ShellOptions, env: Environment) -> Self {
        Self {
            options,
            env,
            status: EXIT_SUCCESS,
            line: 1,
            exit_code: None,
            launch_failed: false,
        }
    }

    /// Status of the last pipeline that actually ran (`$?`).
    pub fn status(&self) -> i32 {
        self.status
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Set once `exit` has run.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Lexes, parses and runs one input line. A syntax error only costs
    /// this line.
    pub fn eval_line(&mut self, input: &str) -> Control {
        let input = input.trim_end_matches(['\n', '\r']);
        match parse(&lex(input)) {
            Ok(line) => {
                self.execute(&line);
            }
            Err(err) => {
                self.report(&err);
                self.status = err.status();
            }
        }
        self.line += 1;

        if let Some(code) = self.exit_code {
            return Control::Exit(code);
        }
        if !self.options.interactive && self.launch_failed {
            debug!(status = self.status, "stopping script after launch failure");
            return Control::Exit(self.status);
        }
        Control::Continue
    }

    /// Runs every chain of `line` in order and returns the last status.
    /// An empty line leaves the status untouched.
    pub fn execute(&mut self, line: &CommandLine) -> i32 {
        self.launch_failed = false;
        for chain in &line.chains {
            self.execute_chain(chain);
            if self.exit_code.is_some() {
                break;
            }
        }
        self.status
    }

    fn execute_chain(&mut self, chain: &Chain) {
        self.run_step(&chain.first);
        for (op, pipeline) in &chain.rest {
            if self.exit_code.is_some() {
                return;
            }
            let proceed = match op {
                LogicalOp::And => self.status == EXIT_SUCCESS,
                LogicalOp::Or => self.status != EXIT_SUCCESS,
            };
            if !proceed {
                debug!(?op, status = self.status, "short-circuit, skipping rest of chain");
                return;
            }
            self.run_step(pipeline);
        }
    }

    fn run_step(&mut self, pipeline: &Pipeline) {
        self.launch_failed = false;
        self.status = match self.run_pipeline(pipeline) {
            Ok(status) => status,
            Err(err) => {
                self.report(&err);
                self.launch_failed = err.is_launch_failure();
                if let ShellError::IllegalNumber(_) = err {
                    self.exit_code = Some(err.status());
                }
                err.status()
            }
        };
    }

    fn run_pipeline(&mut self, pipeline: &Pipeline) -> ExecuteResult {
        let invocations = pipeline
            .commands
            .iter()
            .map(|command| expand_command(command, &self.env, self.status))
            .collect::<Result<Vec<_>, _>>()?;

        let (head, rest) = match invocations.as_slice() {
            [] => return Ok(EXIT_SUCCESS),
            [invocation] => return self.run_single(invocation),
            [head, rest @ ..] => (head, rest),
        };

        let prefix = self.diag_prefix();
        if head.name().is_some_and(is_builtin) {
            let stages = rest
                .iter()
                .map(|invocation| self.stage_spec(invocation, &prefix))
                .collect::<Result<Vec<_>, _>>()?;
            return self.run_builtin_pipeline(head, &stages);
        }

        let stages = invocations
            .iter()
            .map(|invocation| self.stage_spec(invocation, &prefix))
            .collect::<Result<Vec<_>, _>>()?;
        let status = pipeline::run(&stages)?;
        self.launch_failed = stages.last().is_some_and(|spec| spec.never_started(status));
        Ok(status)
    }

    fn run_single(&mut self, invocation: &Invocation) -> ExecuteResult {
        match invocation.name() {
            None => {
                open_redirections(&invocation.redirections)?;
                Ok(EXIT_SUCCESS)
            }
            Some(name) if is_builtin(name) => self.run_builtin(invocation),
            Some(name) => {
                let program = path::resolve(name, &self.env)?;
                let spec = ChildSpec::external(&program, invocation, &self.env, &self.diag_prefix())?;
                let status = launcher::run(&spec)?;
                self.launch_failed = spec.never_started(status);
                Ok(status)
            }
        }
    }

    fn run_builtin(&mut self, invocation: &Invocation) -> ExecuteResult {
        let flow = run_redirected(invocation, &mut self.env, &mut io::stdout())?;
        Ok(self.apply_flow(flow))
    }

    /// A built-in heading a pipeline runs here, not in a child, so its effect
    /// on the environment (or `exit`) reaches the shell. Its output feeds the
    /// first child stage; the pipeline's status is still the last stage's.
    fn run_builtin_pipeline(&mut self, head: &Invocation, stages: &[ChildSpec]) -> ExecuteResult {
        let env = &mut self.env;
        let (outcome, status) = pipeline::run_with_head(|sink| run_redirected(head, env, sink), stages)?;
        self.launch_failed = stages.last().is_some_and(|spec| spec.never_started(status));

        match outcome {
            Ok(Flow::Exit(code)) => {
                self.exit_code = Some(code);
                Ok(code)
            }
            Ok(Flow::Continue(_)) => Ok(status),
            // The reader quit early; nothing was lost that anyone wanted.
            Err(ShellError::Io(err)) if err.kind() == ErrorKind::BrokenPipe => Ok(status),
            Err(err) => Err(err),
        }
    }

    fn apply_flow(&mut self, flow: Flow) -> i32 {
        match flow {
            Flow::Continue(status) => status,
            Flow::Exit(code) => {
                self.exit_code = Some(code);
                code
            }
        }
    }

    /// A child stage of a pipeline always gets a process, even when its name
    /// doesn't resolve, so its neighbours see the pipe close.
    fn stage_spec(&self, invocation: &Invocation, prefix: &str) -> Result<ChildSpec, ShellError> {
        match invocation.name() {
            None => ChildSpec::noop(invocation, prefix),
            Some(name) if is_builtin(name) => ChildSpec::builtin(invocation, &self.env, prefix),
            Some(name) => match path::resolve(name, &self.env) {
                Ok(program) => ChildSpec::external(&program, invocation, &self.env, prefix),
                Err(_) => ChildSpec::missing(invocation, prefix),
            },
        }
    }

    fn diag_prefix(&self) -> String {
        format!("{}: {}: ", self.options.name, self.line)
    }

    fn report(&self, err: &ShellError) {
        eprintln!("{}{}", self.diag_prefix(), err);
    }
}

/// Runs a built-in in the shell process. Output goes to its redirection
/// target if it has one, otherwise to `out`.
fn run_redirected(invocation: &Invocation, env: &mut Environment, out: &mut dyn Write) -> Result<Flow, ShellError> {
    match open_redirections(&invocation.redirections)? {
        Some(mut file) => execute_builtin(&invocation.argv, env, &mut file),
        None => execute_builtin(&invocation.argv, env, out),
    }
}

/// Opens a built-in's redirections in the shell itself: input first (it
/// must exist), then the output file it will write to.
fn open_redirections(redirections: &Redirections) -> Result<Option<File>, ShellError> {
    if let Some(path) = &redirections.input {
        File::open(path).map_err(|source| ShellError::Redirect {
            path: path.clone(),
            source,
        })?;
    }
    redirections
        .output
        .as_ref()
        .map(|(path, mode)| {
            let append = *mode == RedirectMode::Append;
            OpenOptions::new()
                .write(true)
                .create(true)
                .append(append)
                .truncate(!append)
                .open(path)
                .map_err(|source| ShellError::Redirect {
                    path: path.clone(),
                    source,
                })
        })
        .transpose()
}
