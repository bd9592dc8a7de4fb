//!
//! This is the interpreter for the rube language.
//!

use std::cell::RefCell;
use std::rc::Rc;

/// Binding of call arguments to parameters.
pub mod arguments;
/// The construction of the core class hierarchy.
pub mod bootstrap;
/// Facilities for manipulating classes, modules and their metaclasses.
pub mod class;
/// The interpreter's configuration.
pub mod config;
/// Host-level errors.
pub mod error;
/// Facilities for evaluating nodes and expressions.
pub mod evaluate;
/// Facilities for manipulating call frames and backtraces.
pub mod frame;
/// The object arena.
pub mod heap;
/// Facilities for string interning.
pub mod interner;
/// Facilities for invoking methods and/or primitives.
pub mod invokable;
/// Facilities for manipulating closures.
pub mod lambda;
/// Facilities for manipulating methods.
pub mod method;
/// Definitions for all supported primitives.
pub mod primitives;
/// The interpreter's main data structure.
pub mod runtime;
/// Facilities for manipulating lexical scopes.
pub mod scope;
/// Host stack growth for deep recursion.
pub mod stack;
/// Facilities for manipulating values.
pub mod value;

/// A strong and owning reference to a shared, mutable structure.
pub type RubeRef<T> = Rc<RefCell<T>>;

pub use crate::config::{Config, Output};
pub use crate::error::{FatalError, RuntimeError};
pub use crate::invokable::{Eval, Outcome};
pub use crate::runtime::Runtime;
pub use crate::value::Value;
