use thiserror::Error;

use crate::ast::Node;

/// An error reported by a front-end when source text cannot be turned into a syntax tree.
///
/// Front-ends report this instead of handing out a partial tree, so that an
/// interactive shell can tell incomplete input apart from a runtime failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{line}:{column}: {message}")]
pub struct SyntaxError {
    /// The name of the file being parsed.
    pub file: String,
    /// The line at which the error was detected (1-based).
    pub line: u32,
    /// The column at which the error was detected (1-based).
    pub column: u32,
    /// What went wrong.
    pub message: String,
}

impl SyntaxError {
    /// Construct a syntax error.
    pub fn new(
        file: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }
}

/// The interface of a parser front-end.
pub trait Parse {
    /// Parse the given source text, coming from the given file, into a syntax tree.
    fn parse(&self, source: &str, file: &str) -> Result<Node, SyntaxError>;
}
