use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(String),
    Operator(Operator),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Pipe,           // |
    And,            // &&
    Or,             // ||
    Background,     // &
    Semicolon,      // ;
    RedirectOut,    // >
    RedirectIn,     // <
    RedirectAppend, // >>
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Pipe => "|",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Background => "&",
            Operator::Semicolon => ";",
            Operator::RedirectOut => ">",
            Operator::RedirectIn => "<",
            Operator::RedirectAppend => ">>",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(word) => f.write_str(word),
            Token::Operator(op) => op.fmt(f),
        }
    }
}

/// Splits one input line into words and operators. There is no quoting:
/// any run of blanks ends a word.
pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    current: Option<char>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current = chars.next();
        Self {
            input: chars,
            current,
        }
    }

    pub fn next_token(&mut self) -> Option<Token> {
        self.consume_whitespace();

        match self.current? {
            '|' | '&' | '>' | '<' | ';' => Some(self.read_operator()),
            _ => Some(Token::Word(self.read_word())),
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.current {
            if is_blank(c) || is_operator_start(c) {
                break;
            }
            word.push(c);
            self.advance();
        }
        word
    }

    fn read_operator(&mut self) -> Token {
        let first = self.current;
        self.advance();
        let op = match first {
            Some('|') => {
                if self.eat('|') {
                    Operator::Or
                } else {
                    Operator::Pipe
                }
            }
            Some('&') => {
                if self.eat('&') {
                    Operator::And
                } else {
                    Operator::Background
                }
            }
            Some('>') => {
                if self.eat('>') {
                    Operator::RedirectAppend
                } else {
                    Operator::RedirectOut
                }
            }
            Some('<') => Operator::RedirectIn,
            _ => Operator::Semicolon,
        };
        Token::Operator(op)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.current == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_whitespace(&mut self) {
        while let Some(c) = self.current {
            if !is_blank(c) {
                break;
            }
            self.advance();
        }
    }

    fn advance(&mut self) {
        self.current = self.input.next();
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x07')
}

fn is_operator_start(c: char) -> bool {
    matches!(c, '|' | '&' | '>' | '<' | ';')
}

pub fn lex(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}
