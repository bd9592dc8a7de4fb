use std::ops::ControlFlow;

use log::debug;
use num_bigint::BigInt;

use rube_core::ast::{self, Argument, Node, NodeKind};

use crate::arguments;
use crate::class::ModuleKind;
use crate::error::FatalError;
use crate::heap::Payload;
use crate::invokable::{Eval, Invoke, Outcome};
use crate::lambda::{Lambda, LambdaBody};
use crate::method::{MethodBody, MethodKind};
use crate::{proceed, propagate};
use crate::runtime::Runtime;
use crate::scope::{Scope, ScopeRef};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// The evaluated arguments of a call.
#[derive(Debug, Default)]
pub struct Arguments {
    /// The positional values (splats already flattened).
    pub values: Vec<Value>,
    /// The block passed with `&`.
    pub block: Option<Value>,
}

/// The trait for evaluating AST nodes.
pub trait Evaluate {
    /// Evaluate the node within a given runtime and scope.
    fn evaluate(&self, runtime: &mut Runtime, scope: &ScopeRef) -> Eval;
}

impl Evaluate for Node {
    fn evaluate(&self, runtime: &mut Runtime, scope: &ScopeRef) -> Eval {
        ensure_sufficient_stack(|| {
            runtime.with_location(&self.location, |runtime| evaluate_node(self, runtime, scope))
        })
    }
}

fn evaluate_node(node: &Node, runtime: &mut Runtime, scope: &ScopeRef) -> Eval {
    match &node.kind {
        NodeKind::Literal(literal) => literal.evaluate(runtime, scope),
        NodeKind::SelfRef => Ok(Outcome::Value(scope.borrow().get_self())),
        NodeKind::LocalVarRef(name) => {
            let interned = runtime.intern(name);
            if let Some(value) = scope.borrow().get(interned) {
                return Ok(Outcome::Value(value));
            }
            let self_value = scope.borrow().get_self();
            let method_missing = runtime.intern("method_missing");
            if runtime.responds_to(&self_value, interned)?
                || runtime.responds_to(&self_value, method_missing)?
            {
                return runtime.dispatch(self_value, interned, Vec::new(), None);
            }
            let message = format!(
                "undefined local variable or method `{}' for {}",
                name,
                runtime.inspect(&self_value)
            );
            let class = runtime.core.name_error;
            runtime.raise_named(class, message, interned)
        }
        NodeKind::LocalVarAssign(name, value) => {
            let value = propagate!(value.evaluate(runtime, scope));
            let name = runtime.intern(name);
            scope.borrow_mut().set(name, value.clone());
            Ok(Outcome::Value(value))
        }
        NodeKind::InstanceVarRef(name) => {
            let self_value = scope.borrow().get_self();
            let name = runtime.intern(name);
            Ok(Outcome::Value(runtime.ivar_get(&self_value, name)))
        }
        NodeKind::InstanceVarAssign(name, value) => {
            let value = propagate!(value.evaluate(runtime, scope));
            let self_value = scope.borrow().get_self();
            let interned = runtime.intern(name);
            if !runtime.ivar_set(&self_value, interned, value.clone()) {
                let message = format!(
                    "can't set instance variable {} on {}",
                    name,
                    runtime.inspect(&self_value)
                );
                let class = runtime.core.runtime_error;
                return runtime.raise(class, message);
            }
            Ok(Outcome::Value(value))
        }
        NodeKind::ConstantRef(name) => match runtime.constant(name) {
            Some(value) => Ok(Outcome::Value(value)),
            None => {
                let class = runtime.core.name_error;
                let interned = runtime.intern(name);
                runtime.raise_named(class, format!("uninitialized constant {}", name), interned)
            }
        },
        NodeKind::ConstantAssign(name, value) => {
            let value = propagate!(value.evaluate(runtime, scope));
            runtime.set_constant(name, value.clone());
            Ok(Outcome::Value(value))
        }
        NodeKind::MethodCall(call) => call.evaluate(runtime, scope),
        NodeKind::Sequence(statements) => {
            let mut last = Value::Nil;
            for statement in statements {
                last = propagate!(statement.evaluate(runtime, scope));
            }
            Ok(Outcome::Value(last))
        }
        NodeKind::ClassDef(class_def) => class_def.evaluate(runtime, scope),
        NodeKind::ModuleDef(module_def) => module_def.evaluate(runtime, scope),
        NodeKind::MethodDef(method_def) => method_def.evaluate(runtime, scope),
        NodeKind::Conditional(conditional) => {
            let cond = propagate!(conditional.cond.evaluate(runtime, scope));
            if cond.is_truthy() {
                conditional.then_branch.evaluate(runtime, scope)
            } else if let Some(else_branch) = &conditional.else_branch {
                else_branch.evaluate(runtime, scope)
            } else {
                Ok(Outcome::Value(Value::Nil))
            }
        }
        NodeKind::WhileLoop(while_loop) => {
            loop {
                let cond = propagate!(while_loop.cond.evaluate(runtime, scope));
                if !cond.is_truthy() {
                    break;
                }
                propagate!(while_loop.body.evaluate(runtime, scope));
            }
            Ok(Outcome::Value(Value::Nil))
        }
        NodeKind::BeginRescue(begin_rescue) => begin_rescue.evaluate(runtime, scope),
        NodeKind::LambdaLiteral(literal) => runtime.new_closure(literal, scope, true),
        NodeKind::Return(value) => {
            let value = match value {
                Some(value) => propagate!(value.evaluate(runtime, scope)),
                None => Value::Nil,
            };
            let target = scope.borrow().frame();
            match target {
                Some(frame) if runtime.is_frame_live(frame) => {
                    Ok(Outcome::Returned(value, frame))
                }
                _ => {
                    let class = runtime.core.local_jump_error;
                    runtime.raise(class, "unexpected return")
                }
            }
        }
        NodeKind::Yield(args) => {
            let arguments = proceed!(evaluate_arguments(args, runtime, scope));
            let block = scope.borrow().current_block();
            match block {
                Some(block) => runtime.call_proc(&block, arguments.values, arguments.block),
                None => {
                    let class = runtime.core.local_jump_error;
                    runtime.raise(class, "no block given (yield)")
                }
            }
        }
        NodeKind::Super(super_call) => super_call.evaluate(runtime, scope),
        NodeKind::ArrayLiteral(items) => {
            let arguments = proceed!(evaluate_arguments(items, runtime, scope));
            Ok(Outcome::Value(runtime.new_array(arguments.values)))
        }
        NodeKind::And(lhs, rhs) => {
            let lhs = propagate!(lhs.evaluate(runtime, scope));
            if lhs.is_truthy() {
                rhs.evaluate(runtime, scope)
            } else {
                Ok(Outcome::Value(lhs))
            }
        }
        NodeKind::Or(lhs, rhs) => {
            let lhs = propagate!(lhs.evaluate(runtime, scope));
            if lhs.is_truthy() {
                Ok(Outcome::Value(lhs))
            } else {
                rhs.evaluate(runtime, scope)
            }
        }
        NodeKind::Not(value) => {
            let value = propagate!(value.evaluate(runtime, scope));
            Ok(Outcome::Value(Value::Boolean(!value.is_truthy())))
        }
        _ => Err(FatalError::UnimplementedNode {
            kind: node.kind_name(),
            location: node.location.clone(),
        }),
    }
}

impl Evaluate for ast::Literal {
    fn evaluate(&self, runtime: &mut Runtime, _: &ScopeRef) -> Eval {
        let value = match self {
            Self::Nil => Value::Nil,
            Self::True => Value::Boolean(true),
            Self::False => Value::Boolean(false),
            Self::Integer(int) => Value::Integer(*int),
            Self::BigInteger(digits) => match digits.parse::<BigInt>() {
                Ok(value) => Value::from_big(value),
                Err(err) => {
                    let class = runtime.core.syntax_error;
                    return runtime.raise(class, format!("invalid integer literal `{}`: {}", digits, err));
                }
            },
            Self::Float(float) => Value::Float(*float),
            Self::String(string) => runtime.new_string(string.as_str()),
            Self::Symbol(symbol) => Value::Symbol(runtime.intern(symbol)),
        };
        Ok(Outcome::Value(value))
    }
}

/// Evaluate the arguments of a call, left to right.
pub fn evaluate_arguments(
    args: &[Argument],
    runtime: &mut Runtime,
    scope: &ScopeRef,
) -> Result<ControlFlow<Outcome, Arguments>, FatalError> {
    let mut arguments = Arguments::default();
    for arg in args {
        let node = match arg {
            Argument::Value(node) | Argument::Splat(node) | Argument::BlockPass(node) => node,
        };
        let value = match node.evaluate(runtime, scope)? {
            Outcome::Value(value) => value,
            outcome => return Ok(ControlFlow::Break(outcome)),
        };
        match arg {
            Argument::Value(_) => arguments.values.push(value),
            Argument::Splat(_) => match runtime.array_of(&value) {
                Some(values) => arguments.values.extend(values),
                None if value.is_nil() => {}
                None => arguments.values.push(value),
            },
            Argument::BlockPass(_) => match runtime.to_block(value)? {
                Ok(block) => arguments.block = block,
                Err(outcome) => return Ok(ControlFlow::Break(outcome)),
            },
        }
    }
    Ok(ControlFlow::Continue(arguments))
}

impl Evaluate for ast::MethodCall {
    fn evaluate(&self, runtime: &mut Runtime, scope: &ScopeRef) -> Eval {
        let receiver = match &self.receiver {
            Some(receiver) => propagate!(receiver.evaluate(runtime, scope)),
            None => scope.borrow().get_self(),
        };
        let mut arguments = proceed!(evaluate_arguments(&self.args, runtime, scope));
        if let Some(literal) = &self.block {
            arguments.block = Some(propagate!(runtime.new_closure(literal, scope, false)));
        }
        let name = runtime.intern(&self.name);
        runtime.dispatch(receiver, name, arguments.values, arguments.block)
    }
}

impl Evaluate for ast::Super {
    fn evaluate(&self, runtime: &mut Runtime, scope: &ScopeRef) -> Eval {
        let self_value = scope.borrow().get_self();
        let context = scope.borrow().method_context();
        let context = match context {
            Some(context) => context,
            None => {
                let class = runtime.core.runtime_error;
                return runtime.raise(class, "super called outside of method");
            }
        };
        let (values, mut block) = match &self.args {
            Some(args) => {
                let arguments = proceed!(evaluate_arguments(args, runtime, scope));
                (arguments.values, arguments.block)
            }
            None => (context.args.clone(), context.block.clone()),
        };
        if let Some(literal) = &self.block {
            block = Some(propagate!(runtime.new_closure(literal, scope, false)));
        }
        if block.is_none() {
            block = scope.borrow().current_block();
        }
        let klass = runtime.klass_of(&self_value);
        match runtime.lookup_super_method(klass, context.holder, context.name)? {
            Some(method) => method.invoke(runtime, self_value, values, block),
            None => {
                let message = format!(
                    "super: no superclass method `{}' for {}",
                    runtime.lookup_symbol(context.name),
                    runtime.inspect(&self_value)
                );
                let class = runtime.core.no_method_error;
                runtime.raise_named(class, message, context.name)
            }
        }
    }
}

impl Evaluate for ast::ClassDef {
    fn evaluate(&self, runtime: &mut Runtime, scope: &ScopeRef) -> Eval {
        let superclass = match &self.superclass {
            Some(node) => {
                let value = propagate!(node.evaluate(runtime, scope));
                match value.as_object() {
                    Some(id)
                        if runtime.heap.module(id).map(|module| module.kind)
                            == Some(ModuleKind::Class) =>
                    {
                        Some(id)
                    }
                    _ => {
                        let message = format!(
                            "superclass must be a Class ({} given)",
                            runtime.inspect(&value)
                        );
                        return runtime.raise_type_error(message);
                    }
                }
            }
            None => None,
        };

        let class = match runtime.constant(&self.name) {
            Some(existing) => {
                let id = match existing.as_object() {
                    Some(id)
                        if runtime.heap.module(id).map(|module| module.kind)
                            == Some(ModuleKind::Class) =>
                    {
                        id
                    }
                    _ => {
                        return runtime.raise_type_error(format!("{} is not a class", self.name))
                    }
                };
                if let Some(superclass) = superclass {
                    if runtime.superclass_of(id)? != Some(superclass) {
                        return runtime
                            .raise_type_error(format!("superclass mismatch for class {}", self.name));
                    }
                }
                debug!("reopening class {}", self.name);
                id
            }
            None => {
                let superclass = superclass.unwrap_or(runtime.core.object);
                let id = runtime.new_class(Some(&self.name), superclass)?;
                runtime.set_constant(&self.name, Value::Object(id));
                id
            }
        };

        let body_scope = Scope::root(Value::Object(class), None);
        self.body.evaluate(runtime, &body_scope)
    }
}

impl Evaluate for ast::ModuleDef {
    fn evaluate(&self, runtime: &mut Runtime, _: &ScopeRef) -> Eval {
        let module = match runtime.constant(&self.name) {
            Some(existing) => match existing.as_object() {
                Some(id) if runtime.is_plain_module(&existing) => {
                    debug!("reopening module {}", self.name);
                    id
                }
                _ => return runtime.raise_type_error(format!("{} is not a module", self.name)),
            },
            None => {
                let id = runtime.new_module(Some(&self.name))?;
                runtime.set_constant(&self.name, Value::Object(id));
                id
            }
        };

        let body_scope = Scope::root(Value::Object(module), None);
        self.body.evaluate(runtime, &body_scope)
    }
}

impl Evaluate for ast::MethodDef {
    fn evaluate(&self, runtime: &mut Runtime, scope: &ScopeRef) -> Eval {
        if let Err(message) = arguments::validate(&self.params) {
            let class = runtime.core.syntax_error;
            return runtime.raise(class, message);
        }

        let target = match &self.receiver {
            Some(receiver) => {
                let receiver = propagate!(receiver.evaluate(runtime, scope));
                match runtime.singleton_class_of(&receiver)? {
                    Some(singleton) => singleton,
                    None => {
                        let message = format!("can't define singleton method on {}", runtime.inspect(&receiver));
                        return runtime.raise_type_error(message);
                    }
                }
            }
            None => {
                let self_value = scope.borrow().get_self();
                match self_value.as_object() {
                    Some(id) if runtime.is_module_like(&self_value) => id,
                    _ => runtime.class_of(&self_value),
                }
            }
        };

        let name = runtime.intern(&self.name);
        runtime.define_method(
            target,
            name,
            MethodKind::Defined(MethodBody {
                params: self.params.clone(),
                body: self.body.clone(),
            }),
        )?;
        Ok(Outcome::Value(Value::Symbol(name)))
    }
}

impl Evaluate for ast::BeginRescue {
    fn evaluate(&self, runtime: &mut Runtime, scope: &ScopeRef) -> Eval {
        let outcome = match self.body.evaluate(runtime, scope)? {
            Outcome::Raised(exception) => rescue(&self.rescue_clauses, exception, runtime, scope)?,
            outcome => outcome,
        };
        match &self.ensure {
            Some(ensure) => match ensure.evaluate(runtime, scope)? {
                Outcome::Value(_) => Ok(outcome),
                interrupted => Ok(interrupted),
            },
            None => Ok(outcome),
        }
    }
}

/// Run the first rescue clause matching the exception, or let it bubble up.
fn rescue(
    clauses: &[ast::RescueClause],
    exception: Value,
    runtime: &mut Runtime,
    scope: &ScopeRef,
) -> Eval {
    for clause in clauses {
        let mut matches = clause.exception_classes.is_empty();
        for filter in &clause.exception_classes {
            let filter = propagate!(filter.evaluate(runtime, scope));
            let class = match filter.as_object() {
                Some(id) if runtime.is_module_like(&filter) => id,
                _ => {
                    return runtime
                        .raise_type_error("class or module required for rescue clause".to_string())
                }
            };
            if runtime.is_a(&exception, class)? {
                matches = true;
                break;
            }
        }
        if matches {
            if let Some(variable) = &clause.variable {
                let name = runtime.intern(variable);
                scope.borrow_mut().set(name, exception);
            }
            return clause.body.evaluate(runtime, scope);
        }
    }
    Ok(Outcome::Raised(exception))
}

impl Runtime {
    /// Reify a lambda literal (or a block literal) into a closure over the current scope.
    pub fn new_closure(
        &mut self,
        literal: &ast::LambdaLiteral,
        scope: &ScopeRef,
        is_lambda: bool,
    ) -> Eval {
        if let Err(message) = arguments::validate(&literal.params) {
            let class = self.core.syntax_error;
            return self.raise(class, message);
        }
        let lambda = Lambda {
            body: LambdaBody::Defined {
                params: literal.params.clone(),
                body: literal.body.clone(),
                scope: scope.clone(),
            },
            is_lambda,
            location: literal.location.clone(),
        };
        let id = self.heap.allocate(self.core.proc, Payload::Lambda(lambda));
        Ok(Outcome::Value(Value::Object(id)))
    }

    /// Turn the value given to a `&` argument into a block.
    ///
    /// `nil` means no block; symbols and method objects are converted as their `to_proc` would.
    pub fn to_block(
        &mut self,
        value: Value,
    ) -> Result<Result<Option<Value>, Outcome>, FatalError> {
        match value {
            Value::Nil => Ok(Ok(None)),
            Value::Symbol(name) => Ok(Ok(Some(self.symbol_proc(name)))),
            Value::Object(id) if self.heap.lambda(id).is_some() => Ok(Ok(Some(value))),
            Value::Object(id) if self.heap.bound_method(id).is_some() => {
                let bound = self.heap.bound_method(id).cloned();
                let lambda = bound.map(|bound| Lambda {
                    body: LambdaBody::Method(bound),
                    is_lambda: true,
                    location: self.current_location(),
                });
                Ok(Ok(lambda.map(|lambda| {
                    Value::Object(self.heap.allocate(self.core.proc, Payload::Lambda(lambda)))
                })))
            }
            _ => {
                let message = format!(
                    "wrong argument type {} (expected Proc)",
                    self.module_name(self.class_of(&value))
                );
                self.raise_type_error(message).map(Err)
            }
        }
    }
}
