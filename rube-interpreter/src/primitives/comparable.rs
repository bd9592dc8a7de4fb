use std::cmp::Ordering;

use crate::error::FatalError;
use crate::expect_args;
use crate::invokable::{Eval, Outcome};
use crate::primitives::PrimitiveFn;
use crate::runtime::Runtime;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("<", self::lt),
    ("<=", self::lte),
    (">", self::gt),
    (">=", self::gte),
    ("between?", self::between),
];

/// Compare two values through the receiver's `<=>`.
fn compare(
    runtime: &mut Runtime,
    receiver: &Value,
    other: &Value,
) -> Result<Result<Ordering, Outcome>, FatalError> {
    let result = match runtime.send(receiver.clone(), "<=>", vec![other.clone()])? {
        Outcome::Value(result) => result,
        outcome => return Ok(Err(outcome)),
    };
    match result {
        Value::Integer(value) => Ok(Ok(value.cmp(&0))),
        Value::BigInteger(value) => Ok(Ok(value.sign().cmp(&num_bigint::Sign::NoSign))),
        _ => super::comparison_error(runtime, receiver, other).map(Err),
    }
}

fn compare_with(
    signature: &str,
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    accept: fn(Ordering) -> bool,
) -> Eval {
    expect_args!(runtime, signature, args, [
        other => other,
    ]);

    match compare(runtime, &receiver, &other)? {
        Ok(ordering) => Ok(Outcome::Value(Value::Boolean(accept(ordering)))),
        Err(outcome) => Ok(outcome),
    }
}

fn lt(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    compare_with("Comparable#<", runtime, receiver, args, Ordering::is_lt)
}

fn lte(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    compare_with("Comparable#<=", runtime, receiver, args, Ordering::is_le)
}

fn gt(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    compare_with("Comparable#>", runtime, receiver, args, Ordering::is_gt)
}

fn gte(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    compare_with("Comparable#>=", runtime, receiver, args, Ordering::is_ge)
}

fn between(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Comparable#between?";

    expect_args!(runtime, SIGNATURE, args, [
        min => min,
        max => max,
    ]);

    let above_min = match compare(runtime, &receiver, &min)? {
        Ok(ordering) => ordering.is_ge(),
        Err(outcome) => return Ok(outcome),
    };
    if !above_min {
        return Ok(Outcome::Value(Value::Boolean(false)));
    }
    match compare(runtime, &receiver, &max)? {
        Ok(ordering) => Ok(Outcome::Value(Value::Boolean(ordering.is_le()))),
        Err(outcome) => Ok(outcome),
    }
}
