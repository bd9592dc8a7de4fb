use thiserror::Error;

use rube_core::location::Location;
use rube_core::syntax::SyntaxError;

use crate::heap::ObjectId;

/// A host-level failure.
///
/// These are interpreter bugs or broken invariants: they unwind the whole run and
/// are never visible to `rescue`.
#[derive(Debug, Clone, Error)]
pub enum FatalError {
    /// The evaluator met a node kind it does not know about.
    #[error("{location}: cannot evaluate `{kind}` nodes")]
    UnimplementedNode {
        /// The kind of the node.
        kind: &'static str,
        /// Where the node is.
        location: Location,
    },
    /// A primitive returned something it was not allowed to.
    #[error("primitive `{key}` broke its contract: {message}")]
    PrimitiveContract {
        /// The registry key of the primitive.
        key: String,
        /// What went wrong.
        message: String,
    },
    /// No primitive is registered under that key.
    #[error("no primitive is registered as `{0}`")]
    UnknownPrimitive(String),
    /// The core class hierarchy could not be built.
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),
    /// Too many nested calls.
    #[error("stack level too deep ({0} nested calls)")]
    StackDepthExceeded(usize),
    /// An object link points to nothing, or to the wrong kind of object.
    #[error("invalid object {0}: {1}")]
    InvalidObject(ObjectId, String),
}

/// Why a run did not produce a value.
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// An exception was raised and never rescued.
    #[error("{class}: {message}")]
    Uncaught {
        /// The name of the exception's class.
        class: String,
        /// The exception's message.
        message: String,
        /// Where the exception was first raised, innermost call first.
        backtrace: Vec<String>,
    },
    /// The interpreter itself failed.
    #[error(transparent)]
    Fatal(#[from] FatalError),
    /// The source could not be parsed.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}
