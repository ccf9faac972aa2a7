//! Tokenization for pipesh
//!
//! A line is split on whitespace; there is no quoting or escaping. Each
//! word is classified once here, so later stages never compare strings to
//! find operators. Operators are only recognized when they stand alone:
//! `a|b` is a single word.

use nom::{
    bytes::complete::{take_while, take_while1},
    multi::many0,
    sequence::preceded,
    IResult,
};
use std::fmt;

/// Operators that end a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Pipe,       // |
    Background, // &
    Sequence,   // ;
}

impl Control {
    pub fn as_str(self) -> &'static str {
        match self {
            Control::Pipe => "|",
            Control::Background => "&",
            Control::Sequence => ";",
        }
    }
}

/// Operators that rebind a standard stream to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Input,  // <
    Output, // >
    Error,  // 2>
}

impl Redirect {
    pub fn as_str(self) -> &'static str {
        match self {
            Redirect::Input => "<",
            Redirect::Output => ">",
            Redirect::Error => "2>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A command name or argument
    Word(String),
    /// A stage terminator
    Control(Control),
    /// A redirection operator; its target is the next token
    Redirect(Redirect),
}

impl Token {
    /// The text the token was read from
    pub fn as_str(&self) -> &str {
        match self {
            Token::Word(w) => w,
            Token::Control(c) => c.as_str(),
            Token::Redirect(r) => r.as_str(),
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, Token::Control(_))
    }

    pub fn control(&self) -> Option<Control> {
        match self {
            Token::Control(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn classify(word: &str) -> Token {
    match word {
        "|" => Token::Control(Control::Pipe),
        "&" => Token::Control(Control::Background),
        ";" => Token::Control(Control::Sequence),
        "<" => Token::Redirect(Redirect::Input),
        ">" => Token::Redirect(Redirect::Output),
        "2>" => Token::Redirect(Redirect::Error),
        _ => Token::Word(word.to_string()),
    }
}

/// Parse one whitespace-delimited word, skipping leading whitespace
fn word(input: &str) -> IResult<&str, &str> {
    preceded(
        take_while(char::is_whitespace),
        take_while1(|c: char| !c.is_whitespace()),
    )(input)
}

/// Split a line into words without classifying them
pub fn split_words(input: &str) -> Vec<&str> {
    match many0(word)(input) {
        Ok((_, words)) => words,
        // many0 only fails when the inner parser succeeds without consuming,
        // which take_while1 rules out.
        Err(_) => Vec::new(),
    }
}

/// Tokenize a complete input line
pub fn lex(input: &str) -> Vec<Token> {
    split_words(input).into_iter().map(classify).collect()
}
