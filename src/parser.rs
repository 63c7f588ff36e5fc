use std::iter::Peekable;

use tracing::trace;

use crate::ast::{Chain, CommandLine, LogicalOp, Pipeline, Redirect, RedirectMode, SimpleCommand};
use crate::lexer::{Operator, Token};
use crate::types::ShellError;

/// Builds the operator tree for one line. `|` binds tighter than `&&`/`||`,
/// which bind tighter than `;`.
pub fn parse(tokens: &[Token]) -> Result<CommandLine, ShellError> {
    let mut iter = tokens.iter().peekable();
    let line = parse_sequence(&mut iter)?;

    trace!(?line, "parsed");

    Ok(line)
}

fn parse_sequence<'a, I>(tokens: &mut Peekable<I>) -> Result<CommandLine, ShellError>
where
    I: Iterator<Item = &'a Token>,
{
    let mut chains = Vec::new();
    while tokens.peek().is_some() {
        chains.push(parse_logical(tokens)?);
        match tokens.next() {
            Some(Token::Operator(Operator::Semicolon)) | None => {}
            Some(token) => return Err(unexpected(Some(token))),
        }
    }
    Ok(CommandLine { chains })
}

fn parse_logical<'a, I>(tokens: &mut Peekable<I>) -> Result<Chain, ShellError>
where
    I: Iterator<Item = &'a Token>,
{
    let first = parse_pipeline(tokens)?;
    let mut rest = Vec::new();
    while let Some(token) = tokens.peek() {
        let op = match token {
            Token::Operator(Operator::And) => LogicalOp::And,
            Token::Operator(Operator::Or) => LogicalOp::Or,
            _ => break,
        };
        tokens.next(); // Consume the "&&" or "||"
        rest.push((op, parse_pipeline(tokens)?));
    }
    Ok(Chain { first, rest })
}

fn parse_pipeline<'a, I>(tokens: &mut Peekable<I>) -> Result<Pipeline, ShellError>
where
    I: Iterator<Item = &'a Token>,
{
    let mut commands = vec![parse_command(tokens)?];
    while let Some(Token::Operator(Operator::Pipe)) = tokens.peek() {
        tokens.next(); // Consume the "|"
        commands.push(parse_command(tokens)?);
    }
    Ok(Pipeline { commands })
}

fn parse_command<'a, I>(tokens: &mut Peekable<I>) -> Result<SimpleCommand, ShellError>
where
    I: Iterator<Item = &'a Token>,
{
    let mut command = SimpleCommand::default();

    while let Some(token) = tokens.peek() {
        let mode = match token {
            Token::Word(word) => {
                command.words.push(word.clone());
                tokens.next();
                continue;
            }
            Token::Operator(Operator::RedirectOut) => RedirectMode::Overwrite,
            Token::Operator(Operator::RedirectAppend) => RedirectMode::Append,
            Token::Operator(Operator::RedirectIn) => RedirectMode::Input,
            _ => break,
        };
        tokens.next(); // Consume the redirection operator
        match tokens.next() {
            Some(Token::Word(target)) => command.redirects.push(Redirect {
                mode,
                target: target.clone(),
            }),
            other => return Err(unexpected(other)),
        }
    }

    if command.words.is_empty() && command.redirects.is_empty() {
        return Err(unexpected(tokens.peek().copied()));
    }
    Ok(command)
}

fn unexpected(token: Option<&Token>) -> ShellError {
    match token {
        Some(token) => ShellError::Syntax(format!("\"{}\" unexpected", token)),
        None => ShellError::Syntax("end of file unexpected".to_string()),
    }
}
