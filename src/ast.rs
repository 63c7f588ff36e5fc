#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Overwrite, // >
    Append,    // >>
    Input,     // <
}

#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    pub mode: RedirectMode,
    pub target: String,
}

/// One command as written: raw words, expanded only when it runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleCommand {
    pub words: Vec<String>,
    pub redirects: Vec<Redirect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<SimpleCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And, // &&
    Or,  // ||
}

/// Pipelines joined by `&&`/`||`. A short-circuit skips the rest of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub first: Pipeline,
    pub rest: Vec<(LogicalOp, Pipeline)>,
}

/// A whole input line: chains separated by `;`, run in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandLine {
    pub chains: Vec<Chain>,
}

impl CommandLine {
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Redirections left after expansion; a later one of the same direction wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Redirections {
    pub input: Option<String>,
    pub output: Option<(String, RedirectMode)>,
}

/// A simple command ready to run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub argv: Vec<String>,
    pub redirections: Redirections,
}

impl Invocation {
    pub fn name(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}
