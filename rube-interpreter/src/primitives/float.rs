use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};

use crate::expect_args;
use crate::invokable::{Eval, Outcome};
use crate::primitives::PrimitiveFn;
use crate::runtime::{format_float, Runtime};
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("+", self::plus),
    ("-", self::minus),
    ("*", self::times),
    ("/", self::divide),
    ("%", self::modulo),
    ("**", self::power),
    ("-@", self::negate),
    ("<=>", self::compare),
    ("==", self::eq),
    ("<", self::lt),
    ("<=", self::lte),
    (">", self::gt),
    (">=", self::gte),
    ("abs", self::abs),
    ("to_s", self::to_s),
    ("inspect", self::to_s),
    ("to_i", self::to_i),
    ("to_f", self::to_f),
    ("floor", self::floor),
    ("ceil", self::ceil),
    ("round", self::round),
    ("nan?", self::is_nan),
];

fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(value) => Some(*value as f64),
        Value::BigInteger(value) => value.to_f64(),
        Value::Float(value) => Some(*value),
        _ => None,
    }
}

fn arithmetic(
    signature: &str,
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    operation: fn(f64, f64) -> f64,
) -> Eval {
    expect_args!(runtime, signature, args, [
        other => other,
    ]);

    match (receiver, float(&other)) {
        (Value::Float(a), Some(b)) => Ok(Outcome::Value(Value::Float(operation(a, b)))),
        (Value::Float(_), None) => super::coercion_error(runtime, &other, "Float"),
        (receiver, _) => Err(super::wrong_receiver(signature, runtime, &receiver)),
    }
}

fn plus(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    arithmetic("Float#+", runtime, receiver, args, |a, b| a + b)
}

fn minus(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    arithmetic("Float#-", runtime, receiver, args, |a, b| a - b)
}

fn times(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    arithmetic("Float#*", runtime, receiver, args, |a, b| a * b)
}

fn divide(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    arithmetic("Float#/", runtime, receiver, args, |a, b| a / b)
}

fn modulo(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    arithmetic("Float#%", runtime, receiver, args, |a, b| {
        let remainder = a % b;
        if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
            remainder + b
        } else {
            remainder
        }
    })
}

fn power(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    arithmetic("Float#**", runtime, receiver, args, f64::powf)
}

fn negate(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Float#-@";

    expect_args!(runtime, SIGNATURE, args, []);

    match receiver {
        Value::Float(value) => Ok(Outcome::Value(Value::Float(-value))),
        _ => Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
}

fn abs(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Float#abs";

    expect_args!(runtime, SIGNATURE, args, []);

    match receiver {
        Value::Float(value) => Ok(Outcome::Value(Value::Float(value.abs()))),
        _ => Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
}

/// Compare a float with a number: `None` if `other` is not a number, `Some(None)` if either is NaN.
fn ordering(receiver: f64, other: &Value) -> Option<Option<Ordering>> {
    float(other).map(|other| receiver.partial_cmp(&other))
}

fn compare(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Float#<=>";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    let value = match receiver {
        Value::Float(value) => value,
        _ => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    };
    match ordering(value, &other) {
        Some(Some(ordering)) => Ok(Outcome::Value(Value::Integer(ordering as i64))),
        _ => Ok(Outcome::Value(Value::Nil)),
    }
}

fn eq(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Float#==";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    let value = match receiver {
        Value::Float(value) => value,
        _ => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    };
    let equal = matches!(ordering(value, &other), Some(Some(Ordering::Equal)));
    Ok(Outcome::Value(Value::Boolean(equal)))
}

fn relation(
    signature: &str,
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    accept: fn(Ordering) -> bool,
) -> Eval {
    expect_args!(runtime, signature, args, [
        other => other,
    ]);

    let value = match receiver {
        Value::Float(value) => value,
        _ => return Err(super::wrong_receiver(signature, runtime, &receiver)),
    };
    match ordering(value, &other) {
        Some(Some(ordering)) => Ok(Outcome::Value(Value::Boolean(accept(ordering)))),
        Some(None) => Ok(Outcome::Value(Value::Boolean(false))),
        None => super::comparison_error(runtime, &receiver, &other),
    }
}

fn lt(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    relation("Float#<", runtime, receiver, args, Ordering::is_lt)
}

fn lte(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    relation("Float#<=", runtime, receiver, args, Ordering::is_le)
}

fn gt(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    relation("Float#>", runtime, receiver, args, Ordering::is_gt)
}

fn gte(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    relation("Float#>=", runtime, receiver, args, Ordering::is_ge)
}

fn to_s(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Float#to_s";

    expect_args!(runtime, SIGNATURE, args, []);

    match receiver {
        Value::Float(value) => Ok(Outcome::Value(runtime.new_string(format_float(value)))),
        _ => Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
}

fn to_f(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Float#to_f";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(receiver))
}

/// Convert an already integral float to an integer.
fn integral(runtime: &mut Runtime, value: f64) -> Eval {
    if !value.is_finite() {
        return runtime.raise_argument_error(format_float(value));
    }
    if value >= i64::MIN as f64 && value < i64::MAX as f64 {
        return Ok(Outcome::Value(Value::Integer(value as i64)));
    }
    match BigInt::from_f64(value) {
        Some(value) => Ok(Outcome::Value(Value::from_big(value))),
        None => runtime.raise_argument_error(format_float(value)),
    }
}

fn rounding(
    signature: &str,
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    operation: fn(f64) -> f64,
) -> Eval {
    expect_args!(runtime, signature, args, []);

    match receiver {
        Value::Float(value) => integral(runtime, operation(value)),
        _ => Err(super::wrong_receiver(signature, runtime, &receiver)),
    }
}

fn to_i(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    rounding("Float#to_i", runtime, receiver, args, f64::trunc)
}

fn floor(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    rounding("Float#floor", runtime, receiver, args, f64::floor)
}

fn ceil(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    rounding("Float#ceil", runtime, receiver, args, f64::ceil)
}

fn round(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Float#round";

    let value = match receiver {
        Value::Float(value) => value,
        _ => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    };
    match args.as_slice() {
        [] | [Value::Integer(0)] => integral(runtime, value.round()),
        [Value::Integer(digits)] if *digits > 0 => {
            let factor = 10f64.powi((*digits).min(308) as i32);
            Ok(Outcome::Value(Value::Float((value * factor).round() / factor)))
        }
        [Value::Integer(digits)] => {
            let factor = 10f64.powi(digits.saturating_neg().min(308) as i32);
            integral(runtime, (value / factor).round() * factor)
        }
        [other] => super::coercion_error(runtime, other, "Integer"),
        _ => runtime.raise_argument_error(format!(
            "wrong number of arguments (given {}, expected 0..1)",
            args.len()
        )),
    }
}

fn is_nan(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Float#nan?";

    expect_args!(runtime, SIGNATURE, args, []);

    match receiver {
        Value::Float(value) => Ok(Outcome::Value(Value::Boolean(value.is_nan()))),
        _ => Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
}
