//! `$NAME` and `$?` substitution.
//!
//! Runs on each simple command right before its pipeline starts, so `$?`
//! always sees the status of the pipeline that ran just before.

use crate::ast::{Invocation, RedirectMode, Redirections, SimpleCommand};
use crate::env::Environment;
use crate::types::ShellError;

pub fn expand_word(word: &str, env: &Environment, last_status: i32) -> String {
    let mut result = String::with_capacity(word.len());
    let mut chars = word.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        if chars.peek() == Some(&'?') {
            chars.next();
            result.push_str(&last_status.to_string());
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if !(next.is_ascii_alphanumeric() || next == '_') {
                break;
            }
            name.push(next);
            chars.next();
        }
        if name.is_empty() {
            result.push('$'); // Nothing to substitute
        } else if let Some(value) = env.get(&name) {
            result.push_str(value);
        }
    }
    result
}

/// Expands every word; words that end up empty are dropped.
pub fn expand_words(words: &[String], env: &Environment, last_status: i32) -> Vec<String> {
    words
        .iter()
        .map(|word| expand_word(word, env, last_status))
        .filter(|word| !word.is_empty())
        .collect()
}

pub fn expand_command(
    command: &SimpleCommand,
    env: &Environment,
    last_status: i32,
) -> Result<Invocation, ShellError> {
    let argv = expand_words(&command.words, env, last_status);
    let mut redirections = Redirections::default();
    for redirect in &command.redirects {
        let target = expand_word(&redirect.target, env, last_status);
        if target.is_empty() {
            return Err(ShellError::Syntax(format!(
                "redirection target \"{}\" is empty",
                redirect.target
            )));
        }
        match redirect.mode {
            RedirectMode::Input => redirections.input = Some(target),
            mode => redirections.output = Some((target, mode)),
        }
    }
    Ok(Invocation { argv, redirections })
}
