use crate::lexer::{lex, Operator, Token};

fn word(s: &str) -> Token {
    Token::Word(s.to_string())
}

fn op(op: Operator) -> Token {
    Token::Operator(op)
}

#[test]
fn test_operators_split_words_without_spaces() {
    assert_eq!(
        lex("ls -l|wc>>out"),
        vec![
            word("ls"),
            word("-l"),
            op(Operator::Pipe),
            word("wc"),
            op(Operator::RedirectAppend),
            word("out"),
        ]
    );
}

#[test]
fn test_two_character_operators() {
    assert_eq!(
        lex("a&&b||c;d&e<f>g"),
        vec![
            word("a"),
            op(Operator::And),
            word("b"),
            op(Operator::Or),
            word("c"),
            op(Operator::Semicolon),
            word("d"),
            op(Operator::Background),
            word("e"),
            op(Operator::RedirectIn),
            word("f"),
            op(Operator::RedirectOut),
            word("g"),
        ]
    );
}

#[test]
fn test_blank_characters() {
    assert_eq!(lex("  echo\t a \r\n"), vec![word("echo"), word("a")]);
    assert_eq!(lex("a\x07b"), vec![word("a"), word("b")]);
    assert!(lex("").is_empty());
    assert!(lex(" \t ").is_empty());
}

#[test]
fn test_no_quoting_and_dollar_words_stay_whole() {
    assert_eq!(lex("echo 'a b'"), vec![word("echo"), word("'a"), word("b'")]);
    assert_eq!(lex("$HOME/bin $?"), vec![word("$HOME/bin"), word("$?")]);
}

#[test]
fn test_triple_operators_split_greedily() {
    assert_eq!(
        lex("a|||b"),
        vec![word("a"), op(Operator::Or), op(Operator::Pipe), word("b")]
    );
    assert_eq!(
        lex("a>>>b"),
        vec![
            word("a"),
            op(Operator::RedirectAppend),
            op(Operator::RedirectOut),
            word("b"),
        ]
    );
}
