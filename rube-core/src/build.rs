//!
//! Terse constructors for syntax trees, for hosts that synthesize programs
//! without going through a front-end.
//!
//! Every node is created at [`Location::default`]; use [`Node::at`] to give it a position.
//!

use std::rc::Rc;

use crate::ast::*;
use crate::location::Location;

/// Wrap a node kind into a node at the default location.
pub fn node(kind: NodeKind) -> Node {
    Node::new(kind, Location::default())
}

/// `nil`
pub fn nil() -> Node {
    node(NodeKind::Literal(Literal::Nil))
}

/// `true` or `false`
pub fn boolean(value: bool) -> Node {
    let literal = if value { Literal::True } else { Literal::False };
    node(NodeKind::Literal(literal))
}

/// An integer literal.
pub fn int(value: i64) -> Node {
    node(NodeKind::Literal(Literal::Integer(value)))
}

/// An integer literal too big for 64 bits, in decimal.
pub fn big_int(digits: &str) -> Node {
    node(NodeKind::Literal(Literal::BigInteger(digits.to_string())))
}

/// A float literal.
pub fn float(value: f64) -> Node {
    node(NodeKind::Literal(Literal::Float(value)))
}

/// A string literal.
pub fn string(value: &str) -> Node {
    node(NodeKind::Literal(Literal::String(value.to_string())))
}

/// A symbol literal.
pub fn symbol(name: &str) -> Node {
    node(NodeKind::Literal(Literal::Symbol(name.to_string())))
}

/// `self`
pub fn self_ref() -> Node {
    node(NodeKind::SelfRef)
}

/// A bare identifier.
pub fn local(name: &str) -> Node {
    node(NodeKind::LocalVarRef(name.to_string()))
}

/// `name = value`
pub fn assign(name: &str, value: Node) -> Node {
    node(NodeKind::LocalVarAssign(name.to_string(), Box::new(value)))
}

/// `@name` (the name includes its sigil, eg. `ivar("@total")`)
pub fn ivar(name: &str) -> Node {
    node(NodeKind::InstanceVarRef(name.to_string()))
}

/// `@name = value` (the name includes its sigil)
pub fn ivar_assign(name: &str, value: Node) -> Node {
    node(NodeKind::InstanceVarAssign(name.to_string(), Box::new(value)))
}

/// `Name`
pub fn constant(name: &str) -> Node {
    node(NodeKind::ConstantRef(name.to_string()))
}

/// `NAME = value`
pub fn constant_assign(name: &str, value: Node) -> Node {
    node(NodeKind::ConstantAssign(name.to_string(), Box::new(value)))
}

/// A plain argument.
pub fn arg(value: Node) -> Argument {
    Argument::Value(value)
}

/// `*value`
pub fn splat_arg(value: Node) -> Argument {
    Argument::Splat(value)
}

/// `&value`
pub fn block_arg(value: Node) -> Argument {
    Argument::BlockPass(value)
}

/// A method call, in its most general form.
pub fn call_with(
    receiver: Option<Node>,
    name: &str,
    args: Vec<Argument>,
    block: Option<LambdaLiteral>,
) -> Node {
    node(NodeKind::MethodCall(MethodCall {
        receiver: receiver.map(Box::new),
        name: name.to_string(),
        args,
        block: block.map(Box::new),
    }))
}

/// `receiver.name(args...)`
pub fn call(receiver: Node, name: &str, args: Vec<Node>) -> Node {
    call_with(Some(receiver), name, args.into_iter().map(arg).collect(), None)
}

/// `name(args...)`, sent to `self`.
pub fn send(name: &str, args: Vec<Node>) -> Node {
    call_with(None, name, args.into_iter().map(arg).collect(), None)
}

/// `receiver.name(args...) { block }`
pub fn call_block(receiver: Option<Node>, name: &str, args: Vec<Node>, block: LambdaLiteral) -> Node {
    call_with(
        receiver,
        name,
        args.into_iter().map(arg).collect(),
        Some(block),
    )
}

/// A sequence of statements.
pub fn seq(statements: Vec<Node>) -> Node {
    node(NodeKind::Sequence(statements))
}

/// `class name < superclass; body; end`
pub fn class_def(name: &str, superclass: Option<Node>, body: Vec<Node>) -> Node {
    node(NodeKind::ClassDef(ClassDef {
        name: name.to_string(),
        superclass: superclass.map(Box::new),
        body: Box::new(seq(body)),
    }))
}

/// `module name; body; end`
pub fn module_def(name: &str, body: Vec<Node>) -> Node {
    node(NodeKind::ModuleDef(ModuleDef {
        name: name.to_string(),
        body: Box::new(seq(body)),
    }))
}

/// `def name(params); body; end`
pub fn def(name: &str, params: Vec<Parameter>, body: Vec<Node>) -> Node {
    node(NodeKind::MethodDef(MethodDef {
        receiver: None,
        name: name.to_string(),
        params: Rc::new(params),
        body: Rc::new(seq(body)),
    }))
}

/// `def receiver.name(params); body; end`
pub fn def_singleton(receiver: Node, name: &str, params: Vec<Parameter>, body: Vec<Node>) -> Node {
    node(NodeKind::MethodDef(MethodDef {
        receiver: Some(Box::new(receiver)),
        name: name.to_string(),
        params: Rc::new(params),
        body: Rc::new(seq(body)),
    }))
}

/// A mandatory parameter.
pub fn required(name: &str) -> Parameter {
    Parameter {
        name: name.to_string(),
        kind: ParameterKind::Required,
    }
}

/// `name = default`
pub fn optional(name: &str, default: Node) -> Parameter {
    Parameter {
        name: name.to_string(),
        kind: ParameterKind::Optional(Box::new(default)),
    }
}

/// `*name`
pub fn splat(name: &str) -> Parameter {
    Parameter {
        name: name.to_string(),
        kind: ParameterKind::Splat,
    }
}

/// `&name`
pub fn block_param(name: &str) -> Parameter {
    Parameter {
        name: name.to_string(),
        kind: ParameterKind::Block,
    }
}

/// `if cond then ... else ... end`
pub fn conditional(cond: Node, then_branch: Node, else_branch: Option<Node>) -> Node {
    node(NodeKind::Conditional(Conditional {
        cond: Box::new(cond),
        then_branch: Box::new(then_branch),
        else_branch: else_branch.map(Box::new),
    }))
}

/// `while cond do body end`
pub fn while_loop(cond: Node, body: Vec<Node>) -> Node {
    node(NodeKind::WhileLoop(WhileLoop {
        cond: Box::new(cond),
        body: Box::new(seq(body)),
    }))
}

/// `begin body rescue ... ensure ... end`
pub fn begin_rescue(
    body: Vec<Node>,
    rescue_clauses: Vec<RescueClause>,
    ensure: Option<Vec<Node>>,
) -> Node {
    node(NodeKind::BeginRescue(BeginRescue {
        body: Box::new(seq(body)),
        rescue_clauses,
        ensure: ensure.map(|ensure| Box::new(seq(ensure))),
    }))
}

/// `rescue classes... => variable; body`
pub fn rescue(exception_classes: Vec<Node>, variable: Option<&str>, body: Vec<Node>) -> RescueClause {
    RescueClause {
        exception_classes,
        variable: variable.map(String::from),
        body: Box::new(seq(body)),
    }
}

/// A block, to attach to a call.
pub fn block(params: Vec<Parameter>, body: Vec<Node>) -> LambdaLiteral {
    LambdaLiteral {
        params: Rc::new(params),
        body: Rc::new(seq(body)),
        location: Location::default(),
    }
}

/// `->(params) { body }`
pub fn lambda(params: Vec<Parameter>, body: Vec<Node>) -> Node {
    node(NodeKind::LambdaLiteral(block(params, body)))
}

/// `return value`
pub fn ret(value: Option<Node>) -> Node {
    node(NodeKind::Return(value.map(Box::new)))
}

/// `yield args...`
pub fn yield_values(args: Vec<Node>) -> Node {
    node(NodeKind::Yield(args.into_iter().map(arg).collect()))
}

/// `super(args...)`, or a bare `super` forwarding the current arguments.
pub fn super_call(args: Option<Vec<Node>>) -> Node {
    node(NodeKind::Super(Super {
        args: args.map(|args| args.into_iter().map(arg).collect()),
        block: None,
    }))
}

/// `[items...]`
pub fn array(items: Vec<Node>) -> Node {
    node(NodeKind::ArrayLiteral(items.into_iter().map(arg).collect()))
}

/// `lhs && rhs`
pub fn and(lhs: Node, rhs: Node) -> Node {
    node(NodeKind::And(Box::new(lhs), Box::new(rhs)))
}

/// `lhs || rhs`
pub fn or(lhs: Node, rhs: Node) -> Node {
    node(NodeKind::Or(Box::new(lhs), Box::new(rhs)))
}

/// `!value`
pub fn not(value: Node) -> Node {
    node(NodeKind::Not(Box::new(value)))
}
