use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::error::FatalError;
use crate::expect_args;
use crate::invokable::{Eval, Outcome};
use crate::primitives::PrimitiveFn;
use crate::propagate;
use crate::runtime::Runtime;
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
    ("&", self::bitand),
    ("|", self::bitor),
    ("^", self::bitxor),
    ("<<", self::shift_left),
    (">>", self::shift_right),
    ("abs", self::abs),
    ("to_s", self::to_s),
    ("inspect", self::to_s),
    ("to_i", self::to_i),
    ("to_f", self::to_f),
    ("times", self::repeat),
    ("upto", self::upto),
    ("zero?", self::is_zero),
    ("even?", self::is_even),
    ("odd?", self::is_odd),
    ("succ", self::succ),
    ("pred", self::pred),
];

/// Shifting further than this many bits is refused.
const MAX_SHIFT: u64 = 1 << 24;
/// Exponentiation producing more than this many bits is refused.
const MAX_POWER_BITS: u64 = 1 << 26;

macro_rules! demote {
    ($expr:expr) => {
        Ok(Outcome::Value(Value::from_big($expr)))
    };
}

fn big(value: &Value) -> Option<BigInt> {
    match value {
        Value::Integer(value) => Some(BigInt::from(*value)),
        Value::BigInteger(value) => Some(value.clone()),
        _ => None,
    }
}

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
    small: fn(i64, i64) -> Option<i64>,
    large: fn(BigInt, BigInt) -> BigInt,
    floating: fn(f64, f64) -> f64,
) -> Eval {
    expect_args!(runtime, signature, args, [
        other => other,
    ]);

    match (&receiver, &other) {
        (Value::Integer(a), Value::Integer(b)) => match small(*a, *b) {
            Some(value) => Ok(Outcome::Value(Value::Integer(value))),
            None => demote!(large(BigInt::from(*a), BigInt::from(*b))),
        },
        (_, Value::Float(b)) => match float(&receiver) {
            Some(a) => Ok(Outcome::Value(Value::Float(floating(a, *b)))),
            None => Err(super::wrong_receiver(signature, runtime, &receiver)),
        },
        _ => match (big(&receiver), big(&other)) {
            (Some(a), Some(b)) => demote!(large(a, b)),
            (None, _) => Err(super::wrong_receiver(signature, runtime, &receiver)),
            (_, None) => super::coercion_error(runtime, &other, "Integer"),
        },
    }
}

fn plus(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    arithmetic(
        "Integer#+",
        runtime,
        receiver,
        args,
        i64::checked_add,
        |a, b| a + b,
        |a, b| a + b,
    )
}

fn minus(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    arithmetic(
        "Integer#-",
        runtime,
        receiver,
        args,
        i64::checked_sub,
        |a, b| a - b,
        |a, b| a - b,
    )
}

fn times(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    arithmetic(
        "Integer#*",
        runtime,
        receiver,
        args,
        i64::checked_mul,
        |a, b| a * b,
        |a, b| a * b,
    )
}

/// Division rounding towards negative infinity (`None` on overflow).
fn floor_div(a: i64, b: i64) -> Option<i64> {
    let quotient = a.checked_div(b)?;
    if a % b != 0 && (a < 0) != (b < 0) {
        Some(quotient - 1)
    } else {
        Some(quotient)
    }
}

/// Modulo taking the sign of the divisor (`None` on overflow).
fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let remainder = a.checked_rem(b)?;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        Some(remainder + b)
    } else {
        Some(remainder)
    }
}

fn big_floor_div(a: BigInt, b: BigInt) -> BigInt {
    let quotient = &a / &b;
    let remainder = &a - &quotient * &b;
    if !remainder.is_zero() && remainder.is_negative() != b.is_negative() {
        quotient - 1
    } else {
        quotient
    }
}

fn big_floor_mod(a: BigInt, b: BigInt) -> BigInt {
    let remainder = &a % &b;
    if !remainder.is_zero() && remainder.is_negative() != b.is_negative() {
        remainder + b
    } else {
        remainder
    }
}

fn float_mod(a: f64, b: f64) -> f64 {
    let remainder = a % b;
    if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
        remainder + b
    } else {
        remainder
    }
}

fn is_zero_divisor(value: &Value) -> bool {
    match value {
        Value::Integer(value) => *value == 0,
        Value::BigInteger(value) => value.is_zero(),
        _ => false,
    }
}

fn zero_division(runtime: &mut Runtime) -> Eval {
    let class = runtime.core.zero_division_error;
    runtime.raise(class, "divided by 0")
}

fn divide(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    if args.len() == 1 && is_zero_divisor(&args[0]) {
        return zero_division(runtime);
    }
    arithmetic(
        "Integer#/",
        runtime,
        receiver,
        args,
        floor_div,
        big_floor_div,
        |a, b| a / b,
    )
}

fn modulo(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    if args.len() == 1 && is_zero_divisor(&args[0]) {
        return zero_division(runtime);
    }
    arithmetic(
        "Integer#%",
        runtime,
        receiver,
        args,
        floor_mod,
        big_floor_mod,
        float_mod,
    )
}

fn power(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#**";

    expect_args!(runtime, SIGNATURE, args, [
        exponent => exponent,
    ]);

    let base = match big(&receiver) {
        Some(base) => base,
        None => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    };
    match exponent {
        Value::Integer(exponent) if exponent >= 0 => {
            if let (Value::Integer(base), Ok(exponent)) = (&receiver, u32::try_from(exponent)) {
                if let Some(value) = base.checked_pow(exponent) {
                    return Ok(Outcome::Value(Value::Integer(value)));
                }
            }
            let bits = base.bits().saturating_mul(exponent as u64);
            match u32::try_from(exponent) {
                Ok(exponent) if bits <= MAX_POWER_BITS || base.bits() <= 1 => {
                    demote!(base.pow(exponent))
                }
                _ => runtime.raise_argument_error("exponent too large"),
            }
        }
        Value::Integer(exponent) => {
            let base = float(&receiver).unwrap_or(f64::NAN);
            Ok(Outcome::Value(Value::Float(base.powf(exponent as f64))))
        }
        Value::Float(exponent) => {
            let base = float(&receiver).unwrap_or(f64::NAN);
            Ok(Outcome::Value(Value::Float(base.powf(exponent))))
        }
        Value::BigInteger(_) => runtime.raise_argument_error("exponent too large"),
        other => super::coercion_error(runtime, &other, "Integer"),
    }
}

fn negate(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#-@";

    expect_args!(runtime, SIGNATURE, args, []);

    match receiver {
        Value::Integer(value) => match value.checked_neg() {
            Some(value) => Ok(Outcome::Value(Value::Integer(value))),
            None => demote!(-BigInt::from(value)),
        },
        Value::BigInteger(value) => demote!(-value),
        _ => Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
}

/// Compare two numbers: `None` if `other` is not a number, `Some(None)` if they are unordered (NaN).
fn ordering(receiver: &Value, other: &Value) -> Option<Option<Ordering>> {
    match (receiver, other) {
        (Value::Integer(a), Value::Integer(b)) => Some(Some(a.cmp(b))),
        (_, Value::Float(b)) => Some(float(receiver).and_then(|a| a.partial_cmp(b))),
        _ => Some(Some(big(receiver)?.cmp(&big(other)?))),
    }
}

fn compare(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#<=>";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    match ordering(&receiver, &other) {
        Some(Some(ordering)) => Ok(Outcome::Value(Value::Integer(ordering as i64))),
        _ => Ok(Outcome::Value(Value::Nil)),
    }
}

fn eq(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#==";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    let equal = matches!(ordering(&receiver, &other), Some(Some(Ordering::Equal)));
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

    match ordering(&receiver, &other) {
        Some(Some(ordering)) => Ok(Outcome::Value(Value::Boolean(accept(ordering)))),
        Some(None) => Ok(Outcome::Value(Value::Boolean(false))),
        None => super::comparison_error(runtime, &receiver, &other),
    }
}

fn lt(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    relation("Integer#<", runtime, receiver, args, Ordering::is_lt)
}

fn lte(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    relation("Integer#<=", runtime, receiver, args, Ordering::is_le)
}

fn gt(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    relation("Integer#>", runtime, receiver, args, Ordering::is_gt)
}

fn gte(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    relation("Integer#>=", runtime, receiver, args, Ordering::is_ge)
}

fn bitwise(
    signature: &str,
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    small: fn(i64, i64) -> i64,
    large: fn(BigInt, BigInt) -> BigInt,
) -> Eval {
    expect_args!(runtime, signature, args, [
        other => other,
    ]);

    match (&receiver, &other) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Outcome::Value(Value::Integer(small(*a, *b)))),
        _ => match (big(&receiver), big(&other)) {
            (Some(a), Some(b)) => demote!(large(a, b)),
            (None, _) => Err(super::wrong_receiver(signature, runtime, &receiver)),
            (_, None) => super::coercion_error(runtime, &other, "Integer"),
        },
    }
}

fn bitand(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    bitwise("Integer#&", runtime, receiver, args, |a, b| a & b, |a, b| a & b)
}

fn bitor(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    bitwise("Integer#|", runtime, receiver, args, |a, b| a | b, |a, b| a | b)
}

fn bitxor(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    bitwise("Integer#^", runtime, receiver, args, |a, b| a ^ b, |a, b| a ^ b)
}

/// Shift an integer left by `amount` bits (right when negative).
fn shift(signature: &str, runtime: &mut Runtime, receiver: &Value, amount: i64) -> Eval {
    let value = match big(receiver) {
        Some(value) => value,
        None => return Err(super::wrong_receiver(signature, runtime, receiver)),
    };
    if value.is_zero() {
        return Ok(Outcome::Value(Value::Integer(0)));
    }

    let distance = amount.unsigned_abs();
    if amount >= 0 {
        if distance > MAX_SHIFT {
            return runtime.raise_argument_error("shift width too big");
        }
        demote!(value << distance as usize)
    } else if distance > MAX_SHIFT {
        let filled = if value.is_negative() { -1 } else { 0 };
        Ok(Outcome::Value(Value::Integer(filled)))
    } else {
        demote!(value >> distance as usize)
    }
}

fn shift_left(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#<<";

    expect_args!(runtime, SIGNATURE, args, [
        Value::Integer(amount) => amount,
    ]);

    shift(SIGNATURE, runtime, &receiver, amount)
}

fn shift_right(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#>>";

    expect_args!(runtime, SIGNATURE, args, [
        Value::Integer(amount) => amount,
    ]);

    shift(SIGNATURE, runtime, &receiver, amount.saturating_neg())
}

fn abs(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#abs";

    expect_args!(runtime, SIGNATURE, args, []);

    match receiver {
        Value::Integer(value) => match value.checked_abs() {
            Some(value) => Ok(Outcome::Value(Value::Integer(value))),
            None => demote!(BigInt::from(value).abs()),
        },
        Value::BigInteger(value) => demote!(value.abs()),
        _ => Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
}

fn to_s(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#to_s";

    let radix = match args.as_slice() {
        [] => 10,
        [Value::Integer(radix)] if (2..=36).contains(radix) => *radix as u32,
        [Value::Integer(radix)] => {
            let message = format!("invalid radix {}", radix);
            return runtime.raise_argument_error(message);
        }
        [other] => return super::coercion_error(runtime, other, "Integer"),
        _ => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 0..1)",
                args.len()
            ))
        }
    };

    let text = match (&receiver, radix) {
        (Value::Integer(value), 10) => value.to_string(),
        _ => match big(&receiver) {
            Some(value) => value.to_str_radix(radix),
            None => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
        },
    };
    Ok(Outcome::Value(runtime.new_string(text)))
}

fn to_i(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#to_i";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(receiver))
}

fn to_f(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#to_f";

    expect_args!(runtime, SIGNATURE, args, []);

    match float(&receiver) {
        Some(value) => Ok(Outcome::Value(Value::Float(value))),
        None => Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
}

fn repeat(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#times";

    expect_args!(runtime, SIGNATURE, args, []);

    let count = match &receiver {
        Value::Integer(count) => *count,
        Value::BigInteger(count) if count.is_negative() => 0,
        Value::BigInteger(_) => i64::MAX,
        _ => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    };
    let block = match block {
        Some(block) => block,
        None => return super::no_block(runtime),
    };
    for index in 0..count {
        propagate!(runtime.call_proc(&block, vec![Value::Integer(index)], None));
    }

    Ok(Outcome::Value(receiver))
}

fn upto(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#upto";

    expect_args!(runtime, SIGNATURE, args, [
        Value::Integer(limit) => limit,
    ]);

    let start = match &receiver {
        Value::Integer(start) => *start,
        _ => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    };
    let block = match block {
        Some(block) => block,
        None => return super::no_block(runtime),
    };
    for index in start..=limit {
        propagate!(runtime.call_proc(&block, vec![Value::Integer(index)], None));
    }

    Ok(Outcome::Value(receiver))
}

fn is_zero(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#zero?";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(Value::Boolean(matches!(receiver, Value::Integer(0)))))
}

fn parity(signature: &str, runtime: &Runtime, receiver: &Value) -> Result<bool, FatalError> {
    match receiver {
        Value::Integer(value) => Ok(value % 2 == 0),
        Value::BigInteger(value) => Ok((value % 2u32).is_zero()),
        _ => Err(super::wrong_receiver(signature, runtime, receiver)),
    }
}

fn is_even(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#even?";

    expect_args!(runtime, SIGNATURE, args, []);

    let even = parity(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(Value::Boolean(even)))
}

fn is_odd(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#odd?";

    expect_args!(runtime, SIGNATURE, args, []);

    let even = parity(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(Value::Boolean(!even)))
}

fn step(signature: &str, runtime: &mut Runtime, receiver: Value, delta: i64) -> Eval {
    match receiver {
        Value::Integer(value) => match value.checked_add(delta) {
            Some(value) => Ok(Outcome::Value(Value::Integer(value))),
            None => demote!(BigInt::from(value) + delta),
        },
        Value::BigInteger(value) => demote!(value + delta),
        _ => Err(super::wrong_receiver(signature, runtime, &receiver)),
    }
}

fn succ(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#succ";

    expect_args!(runtime, SIGNATURE, args, []);

    step(SIGNATURE, runtime, receiver, 1)
}

fn pred(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Integer#pred";

    expect_args!(runtime, SIGNATURE, args, []);

    step(SIGNATURE, runtime, receiver, -1)
}
