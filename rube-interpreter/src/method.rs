use std::fmt;
use std::rc::Rc;

use rube_core::ast::{ArgumentPattern, Node};

use crate::arguments;
use crate::heap::ObjectId;
use crate::interner::Interned;
use crate::lambda::Lambda;
use crate::primitives::PrimitiveFn;
use crate::value::Value;

/// The body of a user-defined method.
#[derive(Debug, Clone)]
pub struct MethodBody {
    /// The method's parameters.
    pub params: Rc<ArgumentPattern>,
    /// The method's body.
    pub body: Rc<Node>,
}

/// An interpreter primitive, along with where it was registered.
#[derive(Clone, Copy)]
pub struct Primitive {
    /// The class or module the primitive is registered for.
    pub owner: &'static str,
    /// The name of the method.
    pub name: &'static str,
    /// Whether it is defined on the owner's metaclass.
    pub class_side: bool,
    /// The native implementation.
    pub function: PrimitiveFn,
}

impl Primitive {
    /// The registry key (eg. `Integer#+` or `Array.new`).
    pub fn key(&self) -> String {
        let separator = if self.class_side { '.' } else { '#' };
        format!("{}{}{}", self.owner, separator, self.name)
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Primitive").field(&self.key()).finish()
    }
}

/// The kind of a method.
#[derive(Debug, Clone)]
pub enum MethodKind {
    /// A user-defined method from the AST.
    Defined(MethodBody),
    /// An interpreter primitive.
    Primitive(Primitive),
    /// A method whose body is a closure (from `define_method`).
    Closure(Lambda),
}

/// Represents an entry of a method table.
#[derive(Debug, Clone)]
pub struct Method {
    /// The method's name.
    pub name: Interned,
    /// The module the method was defined on.
    pub holder: ObjectId,
    /// The method's kind.
    pub kind: MethodKind,
}

impl Method {
    /// Get the method's kind.
    pub fn kind(&self) -> &MethodKind {
        &self.kind
    }

    /// Whether this method is a primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, MethodKind::Primitive(_))
    }

    /// The number of arguments this method expects (negative when variadic).
    pub fn arity(&self) -> i64 {
        match &self.kind {
            MethodKind::Defined(body) => arguments::arity(&body.params),
            MethodKind::Primitive(_) => -1,
            MethodKind::Closure(lambda) => lambda.arity(),
        }
    }
}

/// A method object (as returned by `Object#method`).
#[derive(Debug, Clone)]
pub struct BoundMethod {
    /// The receiver the method is bound to.
    pub receiver: Value,
    /// The method itself.
    pub method: Rc<Method>,
}
