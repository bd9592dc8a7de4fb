use std::fmt;
use std::rc::Rc;

/// Represents a position within a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// The name of the file this position refers to.
    pub file: Rc<str>,
    /// The line number (1-based).
    pub line: u32,
    /// The column number (1-based).
    pub column: u32,
}

impl Location {
    /// Construct a location given its file, line and column.
    pub fn new(file: impl Into<Rc<str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Construct a location at another position within the same file.
    pub fn moved_to(&self, line: u32, column: u32) -> Self {
        Self {
            file: self.file.clone(),
            line,
            column,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new("(ast)", 1, 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
