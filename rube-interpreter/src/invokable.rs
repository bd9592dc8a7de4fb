use std::rc::Rc;

use log::trace;

use crate::arguments::BindMode;
use crate::error::FatalError;
use crate::evaluate::Evaluate;
use crate::frame::FrameKind;
use crate::interner::Interned;
use crate::lambda::{Lambda, LambdaBody};
use crate::method::{Method, MethodKind, Primitive};
use crate::runtime::Runtime;
use crate::scope::{FrameId, MethodContext, Scope};
use crate::value::Value;

/// Represents the kinds of possible outcomes from an evaluation.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A plain value, for the immediate caller.
    Value(Value),
    /// An exception, bubbling up to the nearest matching `rescue`.
    Raised(Value),
    /// A `return`, unwinding up to the invocation it targets.
    Returned(Value, FrameId),
}

/// The result of evaluating anything.
///
/// Language-level control flow lives in the `Outcome`, host-level failures on the `Err` side.
pub type Eval = Result<Outcome, FatalError>;

/// Unwrap the value of an evaluation, or return early with any other outcome (or failure).
#[macro_export]
macro_rules! propagate {
    ($expr:expr) => {
        match $expr? {
            $crate::invokable::Outcome::Value(value) => value,
            outcome => return Ok(outcome),
        }
    };
}

/// Unwrap a `ControlFlow`, or return early with the outcome that interrupted it.
#[macro_export]
macro_rules! proceed {
    ($expr:expr) => {
        match $expr? {
            std::ops::ControlFlow::Continue(value) => value,
            std::ops::ControlFlow::Break(outcome) => return Ok(outcome),
        }
    };
}

/// The trait for invoking methods and closures.
pub trait Invoke {
    /// Invoke on the given receiver, with the given arguments and block.
    fn invoke(
        &self,
        runtime: &mut Runtime,
        receiver: Value,
        args: Vec<Value>,
        block: Option<Value>,
    ) -> Eval;
}

impl Invoke for Method {
    fn invoke(
        &self,
        runtime: &mut Runtime,
        receiver: Value,
        args: Vec<Value>,
        block: Option<Value>,
    ) -> Eval {
        let label: Rc<str> = Rc::from(runtime.lookup_symbol(self.name));
        match self.kind() {
            MethodKind::Defined(method) => runtime.with_call_frame(
                label,
                Some(self.holder),
                FrameKind::Method,
                block.clone(),
                |runtime, frame| {
                    let context = MethodContext {
                        holder: self.holder,
                        name: self.name,
                        args: args.clone(),
                        block: block.clone(),
                    };
                    let scope = Scope::for_method(receiver, frame, block.clone(), context);
                    propagate!(runtime.bind_arguments(
                        &method.params,
                        args,
                        block,
                        &scope,
                        BindMode::Strict
                    ));
                    Ok(match method.body.evaluate(runtime, &scope)? {
                        Outcome::Returned(value, target) if target == frame => Outcome::Value(value),
                        outcome => outcome,
                    })
                },
            ),
            MethodKind::Primitive(primitive) => runtime.with_call_frame(
                label,
                Some(self.holder),
                FrameKind::Primitive,
                block.clone(),
                |runtime, _| {
                    let outcome = (primitive.function)(runtime, receiver, args, block)?;
                    runtime.check_primitive_outcome(primitive, outcome)
                },
            ),
            MethodKind::Closure(lambda) => runtime.with_call_frame(
                label,
                Some(self.holder),
                FrameKind::Method,
                block.clone(),
                |runtime, frame| {
                    runtime.run_closure(lambda, Some(receiver), args, block, Some(frame))
                },
            ),
        }
    }
}

impl Invoke for Lambda {
    fn invoke(
        &self,
        runtime: &mut Runtime,
        _: Value,
        args: Vec<Value>,
        block: Option<Value>,
    ) -> Eval {
        match &self.body {
            LambdaBody::Symbol(name) => {
                let mut args = args.into_iter();
                let receiver = match args.next() {
                    Some(receiver) => receiver,
                    None => {
                        return runtime.raise_argument_error("no receiver given".to_string())
                    }
                };
                runtime.dispatch(receiver, *name, args.collect(), block)
            }
            LambdaBody::Method(bound) => {
                bound
                    .method
                    .invoke(runtime, bound.receiver.clone(), args, block)
            }
            LambdaBody::Defined { .. } => {
                let label: Rc<str> = if self.is_lambda {
                    Rc::from("lambda")
                } else {
                    Rc::from(format!("block in {}", runtime.current_label()))
                };
                runtime.with_call_frame(label, None, FrameKind::Block, None, |runtime, frame| {
                    let frame = if self.is_lambda { Some(frame) } else { None };
                    runtime.run_closure(self, None, args, block, frame)
                })
            }
        }
    }
}

impl Runtime {
    /// Send a message: look the method up on the receiver's class and invoke it.
    pub fn dispatch(
        &mut self,
        receiver: Value,
        name: Interned,
        args: Vec<Value>,
        block: Option<Value>,
    ) -> Eval {
        let klass = self.klass_of(&receiver);
        trace!(
            "dispatching `{}` on {} ({} arguments)",
            self.lookup_symbol(name),
            self.module_name(klass),
            args.len()
        );
        match self.lookup_method(klass, name)? {
            Some(method) => method.invoke(self, receiver, args, block),
            None => self.method_missing(receiver, name, args, block),
        }
    }

    /// Send a message given by name.
    pub fn send(&mut self, receiver: Value, name: &str, args: Vec<Value>) -> Eval {
        let name = self.intern(name);
        self.dispatch(receiver, name, args, None)
    }

    /// Whether the receiver has a method with that name.
    pub fn responds_to(&self, receiver: &Value, name: Interned) -> Result<bool, FatalError> {
        let klass = self.klass_of(receiver);
        self.lookup_method(klass, name).map(|method| method.is_some())
    }

    /// Handle a message the receiver does not understand.
    ///
    /// It is forwarded to `method_missing` if the receiver defines one, and raises `NoMethodError` otherwise.
    fn method_missing(
        &mut self,
        receiver: Value,
        name: Interned,
        args: Vec<Value>,
        block: Option<Value>,
    ) -> Eval {
        let method_missing = self.intern("method_missing");
        let klass = self.klass_of(&receiver);
        if let Some(method) = self.lookup_method(klass, method_missing)? {
            let mut forwarded = Vec::with_capacity(args.len() + 1);
            forwarded.push(Value::Symbol(name));
            forwarded.extend(args);
            return method.invoke(self, receiver, forwarded, block);
        }
        let message = format!(
            "undefined method `{}' for {}",
            self.lookup_symbol(name),
            self.inspect(&receiver)
        );
        let class = self.core.no_method_error;
        self.raise_named(class, message, name)
    }

    /// Call a closure (a `Proc` object).
    pub fn call_proc(&mut self, value: &Value, args: Vec<Value>, block: Option<Value>) -> Eval {
        let lambda = match value.as_object().and_then(|id| self.heap.lambda(id)) {
            Some(lambda) => lambda.clone(),
            None => {
                let message = format!("{} is not callable", self.inspect(value));
                return self.raise_type_error(message);
            }
        };
        lambda.invoke(self, Value::Nil, args, block)
    }

    /// Evaluate a closure's body within a new child scope of its captured scope.
    ///
    /// `frame` is the invocation a `return` from the body targets. Plain blocks have none:
    /// they bind their arguments leniently and `return` from their home method.
    pub(crate) fn run_closure(
        &mut self,
        lambda: &Lambda,
        self_value: Option<Value>,
        args: Vec<Value>,
        block: Option<Value>,
        frame: Option<FrameId>,
    ) -> Eval {
        match &lambda.body {
            LambdaBody::Defined {
                params,
                body,
                scope,
            } => {
                let scope = Scope::extend(scope, self_value);
                scope.borrow_mut().frame = frame;
                let mode = if frame.is_some() {
                    BindMode::Strict
                } else {
                    BindMode::Lenient
                };
                propagate!(self.bind_arguments(params, args, block, &scope, mode));
                Ok(match body.evaluate(self, &scope)? {
                    Outcome::Returned(value, target) if Some(target) == frame => {
                        Outcome::Value(value)
                    }
                    outcome => outcome,
                })
            }
            _ => lambda.invoke(self, self_value.unwrap_or(Value::Nil), args, block),
        }
    }

    /// Call a block with a different self value (as `Class.new` does with its block).
    pub fn call_block_with_self(
        &mut self,
        block: &Value,
        self_value: Value,
        args: Vec<Value>,
    ) -> Eval {
        let lambda = match block.as_object().and_then(|id| self.heap.lambda(id)) {
            Some(lambda) => lambda.clone(),
            None => {
                let message = format!("{} is not callable", self.inspect(block));
                return self.raise_type_error(message);
            }
        };
        let label: Rc<str> = Rc::from(format!("block in {}", self.current_label()));
        self.with_call_frame(label, None, FrameKind::Block, None, |runtime, _| {
            runtime.run_closure(&lambda, Some(self_value), args, None, None)
        })
    }

    /// Check that what a primitive handed back only refers to live objects.
    fn check_primitive_outcome(&self, primitive: &Primitive, outcome: Outcome) -> Eval {
        let value = match &outcome {
            Outcome::Value(value) | Outcome::Raised(value) | Outcome::Returned(value, _) => value,
        };
        match value {
            Value::Object(id) if !self.heap.contains(*id) => Err(FatalError::PrimitiveContract {
                key: primitive.key(),
                message: format!("returned the dangling object {}", id),
            }),
            _ => Ok(outcome),
        }
    }
}
