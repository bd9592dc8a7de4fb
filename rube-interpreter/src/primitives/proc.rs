use crate::error::FatalError;
use crate::expect_args;
use crate::invokable::{Eval, Outcome};
use crate::lambda::Lambda;
use crate::primitives::PrimitiveFn;
use crate::runtime::Runtime;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("call", self::call),
    ("()", self::call),
    ("yield", self::call),
    ("[]", self::call),
    ("arity", self::arity),
    ("lambda?", self::is_lambda),
    ("to_proc", self::to_proc),
];

fn lambda(signature: &str, runtime: &Runtime, receiver: &Value) -> Result<Lambda, FatalError> {
    receiver
        .as_object()
        .and_then(|id| runtime.heap.lambda(id))
        .cloned()
        .ok_or_else(|| super::wrong_receiver(signature, runtime, receiver))
}

fn call(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    runtime.call_proc(&receiver, args, block)
}

fn arity(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Proc#arity";

    expect_args!(runtime, SIGNATURE, args, []);

    let lambda = lambda(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(Value::Integer(lambda.arity())))
}

fn is_lambda(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Proc#lambda?";

    expect_args!(runtime, SIGNATURE, args, []);

    let lambda = lambda(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(Value::Boolean(lambda.is_lambda)))
}

fn to_proc(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Proc#to_proc";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(receiver))
}
