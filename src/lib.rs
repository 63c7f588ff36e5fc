//! A small POSIX-flavoured command interpreter.
//!
//! Input lines go through [`lexer::lex`] and [`parser::parse`] into a
//! [`ast::CommandLine`], which an [`executor::Executor`] runs against its own
//! copy of the environment.

pub mod ast;
pub mod builtins;
pub mod config;
pub mod env;
pub mod executor;
pub mod expand;
pub mod launcher;
pub mod lexer;
pub mod parser;
pub mod path;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::ShellOptions;
pub use env::Environment;
pub use executor::{Control, Executor};
