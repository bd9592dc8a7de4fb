use std::rc::Rc;

use rube_core::ast::{ArgumentPattern, Node};
use rube_core::location::Location;

use crate::arguments;
use crate::interner::Interned;
use crate::method::BoundMethod;
use crate::scope::ScopeRef;

/// What running a closure actually does.
#[derive(Debug, Clone)]
pub enum LambdaBody {
    /// Evaluate a body from the AST, within the captured scope.
    Defined {
        /// The closure's parameters.
        params: Rc<ArgumentPattern>,
        /// The closure's body.
        body: Rc<Node>,
        /// The captured lexical scope.
        scope: ScopeRef,
    },
    /// Send the named method to the first argument (from `Symbol#to_proc`).
    Symbol(Interned),
    /// Call a bound method (from `Method#to_proc`).
    Method(BoundMethod),
}

/// Represents a closure: either a lambda or a block attached to a call.
#[derive(Debug, Clone)]
pub struct Lambda {
    /// What the closure runs.
    pub body: LambdaBody,
    /// Lambdas check their arity and `return` from themselves.
    /// Blocks are lenient and `return` from their home method.
    pub is_lambda: bool,
    /// Where the closure was created.
    pub location: Location,
}

impl Lambda {
    /// The number of arguments this closure expects (negative when variadic).
    pub fn arity(&self) -> i64 {
        match &self.body {
            LambdaBody::Defined { params, .. } => arguments::arity(params),
            LambdaBody::Symbol(_) => -2,
            LambdaBody::Method(bound) => bound.method.arity(),
        }
    }
}
