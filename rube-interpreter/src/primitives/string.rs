use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use num_bigint::BigInt;

use crate::error::FatalError;
use crate::expect_args;
use crate::invokable::{Eval, Outcome};
use crate::primitives::PrimitiveFn;
use crate::runtime::Runtime;
use crate::value::Value;

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("initialize", self::initialize),
    ("+", self::concatenate),
    ("*", self::repeat),
    ("==", self::eq),
    ("<=>", self::compare),
    ("length", self::length),
    ("size", self::length),
    ("to_s", self::to_s),
    ("to_sym", self::to_sym),
    ("to_i", self::to_i),
    ("upcase", self::upcase),
    ("downcase", self::downcase),
    ("reverse", self::reverse),
    ("include?", self::includes),
    ("[]", self::index),
    ("concat", self::append),
    ("<<", self::append),
    ("empty?", self::is_empty),
    ("inspect", self::inspect),
    ("hash", self::hashcode),
];

fn receiver_string(signature: &str, runtime: &Runtime, receiver: &Value) -> Result<String, FatalError> {
    runtime
        .string_of(receiver)
        .ok_or_else(|| super::wrong_receiver(signature, runtime, receiver))
}

/// Raise the error for an argument that should have been a string.
fn not_a_string(runtime: &mut Runtime, value: &Value) -> Eval {
    let described = match value {
        Value::Nil => "nil".to_string(),
        _ => runtime.module_name(runtime.class_of(value)),
    };
    runtime.raise_type_error(format!("no implicit conversion of {} into String", described))
}

fn initialize(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#initialize";

    let contents = match args.as_slice() {
        [] => String::new(),
        [value] => match runtime.string_of(value) {
            Some(contents) => contents,
            None => return not_a_string(runtime, value),
        },
        _ => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 0..1)",
                args.len()
            ))
        }
    };

    match receiver.as_object().and_then(|id| runtime.heap.string_mut(id)) {
        Some(string) => *string = contents,
        None => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
    Ok(Outcome::Value(Value::Nil))
}

fn concatenate(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#+";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    let mut value = receiver_string(SIGNATURE, runtime, &receiver)?;
    match runtime.string_of(&other) {
        Some(other) => value.push_str(&other),
        None => return not_a_string(runtime, &other),
    }
    Ok(Outcome::Value(runtime.new_string(value)))
}

fn repeat(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#*";

    expect_args!(runtime, SIGNATURE, args, [
        Value::Integer(count) => count,
    ]);

    let value = receiver_string(SIGNATURE, runtime, &receiver)?;
    match usize::try_from(count) {
        Ok(count) => Ok(Outcome::Value(runtime.new_string(value.repeat(count)))),
        Err(_) => runtime.raise_argument_error("negative argument"),
    }
}

fn eq(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#==";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    let value = receiver_string(SIGNATURE, runtime, &receiver)?;
    let equal = runtime.string_of(&other).map_or(false, |other| other == value);
    Ok(Outcome::Value(Value::Boolean(equal)))
}

fn compare(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#<=>";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    let value = receiver_string(SIGNATURE, runtime, &receiver)?;
    match runtime.string_of(&other) {
        Some(other) => Ok(Outcome::Value(Value::Integer(value.cmp(&other) as i64))),
        None => Ok(Outcome::Value(Value::Nil)),
    }
}

fn length(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#length";

    expect_args!(runtime, SIGNATURE, args, []);

    let value = receiver_string(SIGNATURE, runtime, &receiver)?;
    match i64::try_from(value.chars().count()) {
        Ok(length) => Ok(Outcome::Value(Value::Integer(length))),
        Err(err) => Err(FatalError::PrimitiveContract {
            key: SIGNATURE.to_string(),
            message: err.to_string(),
        }),
    }
}

fn to_s(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#to_s";

    expect_args!(runtime, SIGNATURE, args, []);

    receiver_string(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(receiver))
}

fn to_sym(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#to_sym";

    expect_args!(runtime, SIGNATURE, args, []);

    let value = receiver_string(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(Value::Symbol(runtime.intern(&value))))
}

/// Parse the leading integer of a string (`0` if there is none).
fn leading_integer(value: &str) -> Value {
    let trimmed = value.trim_start();
    let (sign, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let mut digits = String::from(sign);
    let mut previous_underscore = false;
    for (position, ch) in rest.chars().enumerate() {
        match ch {
            '0'..='9' => {
                digits.push(ch);
                previous_underscore = false;
            }
            '_' if position > 0 && !previous_underscore => previous_underscore = true,
            _ => break,
        }
    }

    if let Ok(value) = digits.parse::<i64>() {
        return Value::Integer(value);
    }
    match digits.parse::<BigInt>() {
        Ok(value) => Value::from_big(value),
        Err(_) => Value::Integer(0),
    }
}

fn to_i(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#to_i";

    expect_args!(runtime, SIGNATURE, args, []);

    let value = receiver_string(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(leading_integer(&value)))
}

fn transform(
    signature: &str,
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    operation: fn(&str) -> String,
) -> Eval {
    expect_args!(runtime, signature, args, []);

    let value = receiver_string(signature, runtime, &receiver)?;
    Ok(Outcome::Value(runtime.new_string(operation(&value))))
}

fn upcase(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    transform("String#upcase", runtime, receiver, args, str::to_uppercase)
}

fn downcase(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    transform("String#downcase", runtime, receiver, args, str::to_lowercase)
}

fn reverse(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    transform("String#reverse", runtime, receiver, args, |value| {
        value.chars().rev().collect()
    })
}

fn includes(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#include?";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    let value = receiver_string(SIGNATURE, runtime, &receiver)?;
    match runtime.string_of(&other) {
        Some(other) => Ok(Outcome::Value(Value::Boolean(value.contains(&other)))),
        None => not_a_string(runtime, &other),
    }
}

/// Resolve a possibly negative index against a length.
fn resolve_index(index: i64, length: usize) -> Option<usize> {
    if index < 0 {
        length.checked_sub(usize::try_from(index.unsigned_abs()).ok()?)
    } else {
        usize::try_from(index).ok()
    }
}

fn index(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#[]";

    let value = receiver_string(SIGNATURE, runtime, &receiver)?;
    let chars: Vec<char> = value.chars().collect();

    let substring = match args.as_slice() {
        [Value::Integer(index)] => resolve_index(*index, chars.len())
            .filter(|index| *index < chars.len())
            .map(|index| chars[index].to_string()),
        [Value::Integer(start), Value::Integer(count)] => {
            match (resolve_index(*start, chars.len()), usize::try_from(*count)) {
                (Some(start), Ok(count)) if start <= chars.len() => {
                    let end = start.saturating_add(count).min(chars.len());
                    Some(chars[start..end].iter().collect())
                }
                _ => None,
            }
        }
        [other] | [other, _] | [_, other] if !matches!(other, Value::Integer(_)) => {
            let message = format!(
                "no implicit conversion of {} into Integer",
                runtime.module_name(runtime.class_of(other))
            );
            return runtime.raise_type_error(message);
        }
        _ => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 1..2)",
                args.len()
            ))
        }
    };

    match substring {
        Some(substring) => Ok(Outcome::Value(runtime.new_string(substring))),
        None => Ok(Outcome::Value(Value::Nil)),
    }
}

fn append(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#<<";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    let other = match runtime.string_of(&other) {
        Some(other) => other,
        None => return not_a_string(runtime, &other),
    };
    match receiver.as_object().and_then(|id| runtime.heap.string_mut(id)) {
        Some(string) => string.push_str(&other),
        None => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    }
    Ok(Outcome::Value(receiver))
}

fn is_empty(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#empty?";

    expect_args!(runtime, SIGNATURE, args, []);

    let value = receiver_string(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(Value::Boolean(value.is_empty())))
}

fn inspect(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#inspect";

    expect_args!(runtime, SIGNATURE, args, []);

    receiver_string(SIGNATURE, runtime, &receiver)?;
    let inspected = runtime.inspect(&receiver);
    Ok(Outcome::Value(runtime.new_string(inspected)))
}

fn hashcode(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "String#hash";

    expect_args!(runtime, SIGNATURE, args, []);

    let value = receiver_string(SIGNATURE, runtime, &receiver)?;
    let mut hasher = DefaultHasher::new();
    hasher.write(value.as_bytes());

    Ok(Outcome::Value(Value::Integer(hasher.finish() as i64)))
}
