use crate::expect_args;
use crate::invokable::{Eval, Outcome};
use crate::primitives::PrimitiveFn;
use crate::runtime::Runtime;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("to_s", self::to_s),
    ("to_sym", self::to_sym),
    ("to_proc", self::to_proc),
    ("==", self::eq),
];

fn to_s(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Symbol#to_s";

    expect_args!(runtime, SIGNATURE, args, []);

    match receiver {
        Value::Symbol(symbol) => {
            let name = runtime.lookup_symbol(symbol).to_string();
            Ok(Outcome::Value(runtime.new_string(name)))
        }
        _ => Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
}

fn to_sym(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Symbol#to_sym";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(receiver))
}

fn to_proc(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Symbol#to_proc";

    expect_args!(runtime, SIGNATURE, args, []);

    match receiver {
        Value::Symbol(symbol) => Ok(Outcome::Value(runtime.symbol_proc(symbol))),
        _ => Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
}

fn eq(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Symbol#==";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    Ok(Outcome::Value(Value::Boolean(receiver == other)))
}
