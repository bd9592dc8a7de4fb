use crate::expect_args;
use crate::invokable::{Eval, Outcome};
use crate::primitives::PrimitiveFn;
use crate::runtime::Runtime;
use crate::value::Value;

pub static NIL_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("to_s", self::to_s),
    ("inspect", self::inspect),
    ("&", self::and),
    ("|", self::or),
    ("nil?", self::is_nil),
    ("to_a", self::to_a),
];
pub static TRUE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("to_s", self::to_s),
    ("inspect", self::inspect),
    ("&", self::and),
    ("|", self::or),
    ("^", self::xor),
];
pub static FALSE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("to_s", self::to_s),
    ("inspect", self::inspect),
    ("&", self::and),
    ("|", self::or),
    ("^", self::xor),
];

fn to_s(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "NilClass#to_s";

    expect_args!(runtime, SIGNATURE, args, []);

    let displayed = runtime.to_display(&receiver);
    Ok(Outcome::Value(runtime.new_string(displayed)))
}

fn inspect(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "NilClass#inspect";

    expect_args!(runtime, SIGNATURE, args, []);

    let inspected = match receiver {
        Value::Nil => "nil".to_string(),
        other => runtime.to_display(&other),
    };
    Ok(Outcome::Value(runtime.new_string(inspected)))
}

fn and(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "TrueClass#&";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    Ok(Outcome::Value(Value::Boolean(
        receiver.is_truthy() && other.is_truthy(),
    )))
}

fn or(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "TrueClass#|";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    Ok(Outcome::Value(Value::Boolean(
        receiver.is_truthy() || other.is_truthy(),
    )))
}

fn xor(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "TrueClass#^";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    Ok(Outcome::Value(Value::Boolean(
        receiver.is_truthy() != other.is_truthy(),
    )))
}

fn is_nil(runtime: &mut Runtime, _: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "NilClass#nil?";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(Value::Boolean(true)))
}

fn to_a(runtime: &mut Runtime, _: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "NilClass#to_a";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(runtime.new_array(Vec::new())))
}
