//!
//! This crate contains common types that are useful to be shared across multiple tools when manipulating rube programs.
//!

/// The rube Abstract Syntax Tree definitions.
pub mod ast;
/// Helpers for constructing syntax trees by hand.
pub mod build;
/// Source code locations.
pub mod location;
/// The interface between front-ends and the interpreter.
pub mod syntax;
