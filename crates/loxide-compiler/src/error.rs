use std::fmt;
use thiserror::Error;

/// Where in the token stream an error was reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorLocation {
    /// At a source token; holds its lexeme.
    Token(String),
    /// At end of input.
    End,
    /// A lexical error token; the message already describes it.
    Lexical,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorLocation::Token(lexeme) => write!(f, " at '{lexeme}'"),
            ErrorLocation::End => f.write_str(" at end"),
            ErrorLocation::Lexical => Ok(()),
        }
    }
}

/// A single compile diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct CompileError {
    pub line: u32,
    pub location: ErrorLocation,
    pub message: String,
}

/// Every diagnostic reported by a failed compilation, in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileErrors(pub Vec<CompileError>);

impl CompileErrors {
    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}
