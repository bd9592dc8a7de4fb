use std::rc::Rc;

use crate::location::Location;

/// An identifier (local, instance variable, constant or method name).
pub type Identifier = String;

/// Represents a node of the syntax tree, along with where it comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// What this node is.
    pub kind: NodeKind,
    /// Where this node starts in its source file.
    pub location: Location,
}

/// Represents the kind of a syntax tree node.
///
/// Exemple:
/// ```text
/// "literal"               42
/// "local reference"       counter
/// "local assignment"      counter = 10
/// "instance variable"     @total
/// "constant"              Counter
/// "method call"           counter.increment(5) { |value| value * 2 }
/// "class definition"      class Counter < Base ... end
/// "method definition"     def increment(by = 1) ... end
/// "conditional"           if total > 5 then ... else ... end
/// "loop"                  while total < 10 ... end
/// "exception handling"    begin ... rescue ArgumentError => err ... ensure ... end
/// "lambda"                ->(value) { value * 2 }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum NodeKind {
    /// A literal value (eg. `42`, `'foo'`, `:bar`, `nil`).
    Literal(Literal),
    /// A reference to the current receiver (`self`).
    SelfRef,
    /// A reference to a local binding, or an argument-less call on `self`.
    LocalVarRef(Identifier),
    /// An assignment to a local binding (eg. `counter = 10`).
    LocalVarAssign(Identifier, Box<Node>),
    /// A reference to an instance variable (eg. `@total`).
    InstanceVarRef(Identifier),
    /// An assignment to an instance variable (eg. `@total = 0`).
    InstanceVarAssign(Identifier, Box<Node>),
    /// A reference to a constant (eg. `Counter`).
    ConstantRef(Identifier),
    /// An assignment to a constant (eg. `LIMIT = 10`).
    ConstantAssign(Identifier, Box<Node>),
    /// A method call (eg. `counter.increment(5)`).
    MethodCall(MethodCall),
    /// A sequence of statements, the last one being the value of the whole.
    Sequence(Vec<Node>),
    /// A class definition (or re-opening).
    ClassDef(ClassDef),
    /// A module definition (or re-opening).
    ModuleDef(ModuleDef),
    /// A method definition.
    MethodDef(MethodDef),
    /// A conditional (eg. `if cond then a else b end`).
    Conditional(Conditional),
    /// A while loop (eg. `while cond do ... end`).
    WhileLoop(WhileLoop),
    /// A `begin`/`rescue`/`ensure` construct.
    BeginRescue(BeginRescue),
    /// A lambda literal (eg. `->(a, b) { a + b }`).
    LambdaLiteral(LambdaLiteral),
    /// An explicit return (eg. `return 42`).
    Return(Option<Box<Node>>),
    /// A call to the block given to the current method (eg. `yield 1, 2`).
    Yield(ArgumentList),
    /// A call to the overriden method (eg. `super(a)`, or `super` to forward arguments).
    Super(Super),
    /// An array literal (eg. `[1, *rest]`).
    ArrayLiteral(ArgumentList),
    /// A short-circuiting conjunction (eg. `a && b`).
    And(Box<Node>, Box<Node>),
    /// A short-circuiting disjunction (eg. `a || b`).
    Or(Box<Node>, Box<Node>),
    /// A negation (eg. `!a`).
    Not(Box<Node>),
}

/// Represents a literal.
///
/// Exemple:
/// ```text
/// nil          "nil literal"
/// true         "boolean literal"
/// 42           "integer literal"
/// 3.14         "float literal"
/// 'hello'      "string literal"
/// :foo         "symbol literal"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// The `nil` literal.
    Nil,
    /// The `true` literal.
    True,
    /// The `false` literal.
    False,
    /// Represents a integer number literal (eg. `42`).
    Integer(i64),
    /// Represents a big integer (bigger than a 64-bit signed integer can represent).
    BigInteger(String),
    /// Represents a decimal number literal (eg. `3.14`).
    Float(f64),
    /// Represents a string literal (eg. `'hello'`).
    String(String),
    /// Represents a symbol literal (eg. `:foo`).
    Symbol(String),
}

/// Represents a method call.
///
/// Exemple:
/// ```text
/// "call with an explicit receiver"
/// counter.increment(5)
///
/// "call on self"
/// puts 'hello'
///
/// "call with a literal block"
/// list.each { |value| puts value }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// The object to which the call is sent (`self` if absent).
    pub receiver: Option<Box<Node>>,
    /// The name of the called method.
    pub name: Identifier,
    /// The arguments passed to the method.
    pub args: ArgumentList,
    /// The literal block attached to the call.
    pub block: Option<Box<LambdaLiteral>>,
}

/// Represents a class definition.
///
/// Exemple:
/// ```text
/// class Counter < Base
///   def increment
///     @total = @total + 1
///   end
/// end
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// The name of the class.
    pub name: Identifier,
    /// The expression evaluating to the superclass.
    pub superclass: Option<Box<Node>>,
    /// The body of the class definition.
    pub body: Box<Node>,
}

/// Represents a module definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDef {
    /// The name of the module.
    pub name: Identifier,
    /// The body of the module definition.
    pub body: Box<Node>,
}

/// Represents a method definition.
///
/// Exemple:
/// ```text
/// "instance method"    def increment(by = 1) @total += by end
/// "singleton method"   def self.create(*args) new(*args) end
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// The object on whose singleton class the method is defined, if any.
    pub receiver: Option<Box<Node>>,
    /// The name of the method.
    pub name: Identifier,
    /// The method's parameters.
    pub params: Rc<ArgumentPattern>,
    /// The method's body.
    pub body: Rc<Node>,
}

/// Represents a conditional.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    /// The condition.
    pub cond: Box<Node>,
    /// The branch evaluated when the condition is truthy.
    pub then_branch: Box<Node>,
    /// The branch evaluated when the condition is falsy.
    pub else_branch: Option<Box<Node>>,
}

/// Represents a while loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    /// The condition, checked before each iteration.
    pub cond: Box<Node>,
    /// The body of the loop.
    pub body: Box<Node>,
}

/// Represents a `begin`/`rescue`/`ensure` construct.
///
/// Exemple:
/// ```text
/// begin
///   risky
/// rescue ArgumentError, TypeError => err
///   puts err.message
/// rescue
///   puts 'something else'
/// ensure
///   cleanup
/// end
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BeginRescue {
    /// The protected body.
    pub body: Box<Node>,
    /// The handlers, tried in order.
    pub rescue_clauses: Vec<RescueClause>,
    /// The body to always run on the way out.
    pub ensure: Option<Box<Node>>,
}

/// Represents a single `rescue` handler.
#[derive(Debug, Clone, PartialEq)]
pub struct RescueClause {
    /// The expressions evaluating to the handled exception classes (catches everything if empty).
    pub exception_classes: Vec<Node>,
    /// The local to bind the exception to.
    pub variable: Option<Identifier>,
    /// The body of the handler.
    pub body: Box<Node>,
}

/// Represents a lambda literal, or a block attached to a call.
///
/// Exemple:
/// ```text
/// ->(value) { value * 2 }
/// list.map { |value| value * 2 }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaLiteral {
    /// The lambda's parameters.
    pub params: Rc<ArgumentPattern>,
    /// The lambda's body.
    pub body: Rc<Node>,
    /// Where the literal starts in its source file.
    pub location: Location,
}

/// Represents a call to the overriden method.
#[derive(Debug, Clone, PartialEq)]
pub struct Super {
    /// The explicit arguments (`None` forwards the current method's arguments).
    pub args: Option<ArgumentList>,
    /// The literal block attached to the call.
    pub block: Option<Box<LambdaLiteral>>,
}

/// Represents the arguments of a call.
pub type ArgumentList = Vec<Argument>;

/// Represents a single argument of a call.
///
/// Exemple:
/// ```text
/// call(value, *values, &block)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A plain argument.
    Value(Node),
    /// An array whose elements are passed as separate arguments.
    Splat(Node),
    /// A lambda passed as the call's block.
    BlockPass(Node),
}

/// Represents the parameters of a method or a lambda.
pub type ArgumentPattern = Vec<Parameter>;

/// Represents a single parameter.
///
/// Exemple:
/// ```text
/// def call(required, optional = 2, *rest, last, &block)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// The name the argument gets bound to.
    pub name: Identifier,
    /// The parameter's kind.
    pub kind: ParameterKind,
}

/// Represents the kind of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    /// A mandatory parameter.
    Required,
    /// A parameter with a default value, evaluated only if no argument is given.
    Optional(Box<Node>),
    /// A parameter gathering all unclaimed arguments into an array.
    Splat,
    /// A parameter receiving the call's block.
    Block,
}

impl Node {
    /// Construct a node from its kind and location.
    pub fn new(kind: NodeKind, location: Location) -> Self {
        Self { kind, location }
    }

    /// Get the node's location.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Move the node to another position within the same file.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.location = self.location.moved_to(line, column);
        self
    }

    /// Get a human-readable name for the node's kind.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Literal(_) => "Literal",
            NodeKind::SelfRef => "SelfRef",
            NodeKind::LocalVarRef(_) => "LocalVarRef",
            NodeKind::LocalVarAssign(..) => "LocalVarAssign",
            NodeKind::InstanceVarRef(_) => "InstanceVarRef",
            NodeKind::InstanceVarAssign(..) => "InstanceVarAssign",
            NodeKind::ConstantRef(_) => "ConstantRef",
            NodeKind::ConstantAssign(..) => "ConstantAssign",
            NodeKind::MethodCall(_) => "MethodCall",
            NodeKind::Sequence(_) => "Sequence",
            NodeKind::ClassDef(_) => "ClassDef",
            NodeKind::ModuleDef(_) => "ModuleDef",
            NodeKind::MethodDef(_) => "MethodDef",
            NodeKind::Conditional(_) => "Conditional",
            NodeKind::WhileLoop(_) => "WhileLoop",
            NodeKind::BeginRescue(_) => "BeginRescue",
            NodeKind::LambdaLiteral(_) => "LambdaLiteral",
            NodeKind::Return(_) => "Return",
            NodeKind::Yield(_) => "Yield",
            NodeKind::Super(_) => "Super",
            NodeKind::ArrayLiteral(_) => "ArrayLiteral",
            NodeKind::And(..) => "And",
            NodeKind::Or(..) => "Or",
            NodeKind::Not(_) => "Not",
        }
    }

    /// Get the direct children of this node, in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        fn arguments(args: &[Argument]) -> impl Iterator<Item = &Node> {
            args.iter().map(|arg| match arg {
                Argument::Value(node) | Argument::Splat(node) | Argument::BlockPass(node) => node,
            })
        }

        fn defaults(params: &[Parameter]) -> impl Iterator<Item = &Node> {
            params.iter().filter_map(|param| match &param.kind {
                ParameterKind::Optional(default) => Some(default.as_ref()),
                _ => None,
            })
        }

        fn lambda(literal: &LambdaLiteral) -> impl Iterator<Item = &Node> {
            defaults(&literal.params).chain(std::iter::once(literal.body.as_ref()))
        }

        match &self.kind {
            NodeKind::Literal(_)
            | NodeKind::SelfRef
            | NodeKind::LocalVarRef(_)
            | NodeKind::InstanceVarRef(_)
            | NodeKind::ConstantRef(_) => Vec::new(),
            NodeKind::LocalVarAssign(_, value)
            | NodeKind::InstanceVarAssign(_, value)
            | NodeKind::ConstantAssign(_, value)
            | NodeKind::Not(value) => vec![value.as_ref()],
            NodeKind::And(lhs, rhs) | NodeKind::Or(lhs, rhs) => vec![lhs.as_ref(), rhs.as_ref()],
            NodeKind::MethodCall(call) => call
                .receiver
                .as_deref()
                .into_iter()
                .chain(arguments(&call.args))
                .chain(call.block.iter().flat_map(|block| lambda(block)))
                .collect(),
            NodeKind::Sequence(statements) => statements.iter().collect(),
            NodeKind::ClassDef(defn) => defn
                .superclass
                .as_deref()
                .into_iter()
                .chain(std::iter::once(defn.body.as_ref()))
                .collect(),
            NodeKind::ModuleDef(defn) => vec![defn.body.as_ref()],
            NodeKind::MethodDef(defn) => defn
                .receiver
                .as_deref()
                .into_iter()
                .chain(defaults(&defn.params))
                .chain(std::iter::once(defn.body.as_ref()))
                .collect(),
            NodeKind::Conditional(cond) => std::iter::once(cond.cond.as_ref())
                .chain(std::iter::once(cond.then_branch.as_ref()))
                .chain(cond.else_branch.as_deref())
                .collect(),
            NodeKind::WhileLoop(while_loop) => {
                vec![while_loop.cond.as_ref(), while_loop.body.as_ref()]
            }
            NodeKind::BeginRescue(begin) => std::iter::once(begin.body.as_ref())
                .chain(begin.rescue_clauses.iter().flat_map(|clause| {
                    clause
                        .exception_classes
                        .iter()
                        .chain(std::iter::once(clause.body.as_ref()))
                }))
                .chain(begin.ensure.as_deref())
                .collect(),
            NodeKind::LambdaLiteral(literal) => lambda(literal).collect(),
            NodeKind::Return(value) => value.as_deref().into_iter().collect(),
            NodeKind::Yield(args) | NodeKind::ArrayLiteral(args) => arguments(args).collect(),
            NodeKind::Super(call) => call
                .args
                .iter()
                .flat_map(|args| arguments(args))
                .chain(call.block.iter().flat_map(|block| lambda(block)))
                .collect(),
        }
    }
}
