use std::ops::ControlFlow;

use crate::error::FatalError;
use crate::heap::ObjectId;
use crate::invokable::{Eval, Outcome};
use crate::primitives::PrimitiveFn;
use crate::runtime::Runtime;
use crate::value::Value;
use crate::{expect_args, propagate};

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("[]", self::at),
    ("[]=", self::at_put),
    ("length", self::length),
    ("size", self::length),
    ("push", self::push),
    ("<<", self::append),
    ("pop", self::pop),
    ("first", self::first),
    ("last", self::last),
    ("each", self::each),
    ("each_with_index", self::each_with_index),
    ("map", self::map),
    ("select", self::select),
    ("inject", self::inject),
    ("include?", self::includes),
    ("join", self::join),
    ("empty?", self::is_empty),
    ("+", self::concatenate),
    ("==", self::eq),
    ("reverse", self::reverse),
    ("to_a", self::to_a),
    ("inspect", self::inspect),
    ("to_s", self::inspect),
];

pub static CLASS_PRIMITIVES: &[(&str, PrimitiveFn)] = &[("new", self::new)];

/// A snapshot of the receiver's elements.
fn elements(signature: &str, runtime: &Runtime, receiver: &Value) -> Result<Vec<Value>, FatalError> {
    runtime
        .array_of(receiver)
        .ok_or_else(|| super::wrong_receiver(signature, runtime, receiver))
}

fn elements_mut<'a>(
    signature: &str,
    runtime: &'a mut Runtime,
    receiver: &Value,
) -> Result<&'a mut Vec<Value>, FatalError> {
    let id = match receiver.as_object() {
        Some(id) if runtime.heap.array(id).is_some() => id,
        _ => return Err(super::wrong_receiver(signature, runtime, receiver)),
    };
    runtime
        .heap
        .array_mut(id)
        .ok_or_else(|| FatalError::PrimitiveContract {
            key: signature.to_string(),
            message: format!("the array {} vanished", id),
        })
}

/// The element at `index` (re-read on every call, as the array may change under iteration).
fn element_at(runtime: &Runtime, receiver: &Value, index: usize) -> Option<Value> {
    let id = receiver.as_object()?;
    runtime.heap.array(id)?.get(index).cloned()
}

/// Resolve a possibly negative index against a length.
fn resolve_index(index: i64, length: usize) -> Option<usize> {
    if index < 0 {
        length.checked_sub(usize::try_from(index.unsigned_abs()).ok()?)
    } else {
        usize::try_from(index).ok()
    }
}

/// The largest number of elements an array may hold.
const MAX_ARRAY_SIZE: usize = isize::MAX as usize / std::mem::size_of::<Value>();

/// Reserve room for `additional` more elements, within `MAX_ARRAY_SIZE`.
fn reserve(values: &mut Vec<Value>, additional: usize) -> Option<()> {
    let total = values.len().checked_add(additional)?;
    if total > MAX_ARRAY_SIZE {
        return None;
    }
    values.try_reserve(additional).ok()
}

fn integer(value: usize) -> Value {
    i64::try_from(value).map_or(Value::Nil, Value::Integer)
}

fn new(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array.new";

    let class = super::module::module_receiver(SIGNATURE, runtime, &receiver)?;
    let (size, default) = match args.as_slice() {
        [] => (0, Value::Nil),
        [Value::Integer(size)] => (*size, Value::Nil),
        [Value::Integer(size), default] => (*size, default.clone()),
        [other] | [other, _] => return super::coercion_error(runtime, other, "Integer"),
        _ => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 0..2)",
                args.len()
            ))
        }
    };
    let size = match usize::try_from(size) {
        Ok(size) => size,
        Err(_) => return runtime.raise_argument_error("negative array size"),
    };

    let mut values = Vec::new();
    if reserve(&mut values, size).is_none() {
        return runtime.raise_argument_error("array size too big");
    }
    for index in 0..size {
        let value = match &block {
            Some(block) => propagate!(runtime.call_proc(block, vec![integer(index)], None)),
            None => default.clone(),
        };
        values.push(value);
    }

    let instance = propagate!(super::class::allocate_instance(runtime, class));
    *elements_mut(SIGNATURE, runtime, &instance)? = values;
    Ok(Outcome::Value(instance))
}

fn at(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#[]";

    let values = elements(SIGNATURE, runtime, &receiver)?;
    match args.as_slice() {
        [Value::Integer(index)] => {
            let value = resolve_index(*index, values.len())
                .and_then(|index| values.get(index).cloned())
                .unwrap_or(Value::Nil);
            Ok(Outcome::Value(value))
        }
        [Value::Integer(start), Value::Integer(count)] => {
            match (resolve_index(*start, values.len()), usize::try_from(*count)) {
                (Some(start), Ok(count)) if start <= values.len() => {
                    let end = start.saturating_add(count).min(values.len());
                    Ok(Outcome::Value(runtime.new_array(values[start..end].to_vec())))
                }
                _ => Ok(Outcome::Value(Value::Nil)),
            }
        }
        [other] | [other, _] | [_, other] if !matches!(other, Value::Integer(_)) => {
            super::coercion_error(runtime, other, "Integer")
        }
        _ => runtime.raise_argument_error(format!(
            "wrong number of arguments (given {}, expected 1..2)",
            args.len()
        )),
    }
}

fn at_put(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#[]=";

    expect_args!(runtime, SIGNATURE, args, [
        index => index,
        value => value,
    ]);

    let index = match index {
        Value::Integer(index) => index,
        other => return super::coercion_error(runtime, &other, "Integer"),
    };
    let length = elements(SIGNATURE, runtime, &receiver)?.len();
    let position = match resolve_index(index, length) {
        Some(position) => position,
        None => {
            let message = format!(
                "index {} too small for array; minimum: -{}",
                index, length
            );
            let class = runtime.core.index_error;
            return runtime.raise(class, message);
        }
    };

    let values = elements_mut(SIGNATURE, runtime, &receiver)?;
    if position >= values.len() {
        let missing = position - values.len() + 1;
        if reserve(values, missing).is_none() {
            let class = runtime.core.index_error;
            return runtime.raise(class, format!("index {} too big", index));
        }
        values.resize(position + 1, Value::Nil);
    }
    values[position] = value.clone();
    Ok(Outcome::Value(value))
}

fn length(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#length";

    expect_args!(runtime, SIGNATURE, args, []);

    let length = elements(SIGNATURE, runtime, &receiver)?.len();
    Ok(Outcome::Value(integer(length)))
}

fn push(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#push";

    elements_mut(SIGNATURE, runtime, &receiver)?.extend(args);
    Ok(Outcome::Value(receiver))
}

fn append(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#<<";

    expect_args!(runtime, SIGNATURE, args, [
        value => value,
    ]);

    elements_mut(SIGNATURE, runtime, &receiver)?.push(value);
    Ok(Outcome::Value(receiver))
}

fn pop(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#pop";

    expect_args!(runtime, SIGNATURE, args, []);

    let value = elements_mut(SIGNATURE, runtime, &receiver)?.pop();
    Ok(Outcome::Value(value.unwrap_or(Value::Nil)))
}

fn first(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#first";

    expect_args!(runtime, SIGNATURE, args, []);

    let values = elements(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(values.first().cloned().unwrap_or(Value::Nil)))
}

fn last(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#last";

    expect_args!(runtime, SIGNATURE, args, []);

    let values = elements(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(values.last().cloned().unwrap_or(Value::Nil)))
}

fn each(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#each";

    expect_args!(runtime, SIGNATURE, args, []);

    elements(SIGNATURE, runtime, &receiver)?;
    let block = match block {
        Some(block) => block,
        None => return super::no_block(runtime),
    };

    let mut index = 0;
    while let Some(value) = element_at(runtime, &receiver, index) {
        propagate!(runtime.call_proc(&block, vec![value], None));
        index += 1;
    }
    Ok(Outcome::Value(receiver))
}

fn each_with_index(
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    block: Option<Value>,
) -> Eval {
    const SIGNATURE: &str = "Array#each_with_index";

    expect_args!(runtime, SIGNATURE, args, []);

    elements(SIGNATURE, runtime, &receiver)?;
    let block = match block {
        Some(block) => block,
        None => return super::no_block(runtime),
    };

    let mut index = 0;
    while let Some(value) = element_at(runtime, &receiver, index) {
        propagate!(runtime.call_proc(&block, vec![value, integer(index)], None));
        index += 1;
    }
    Ok(Outcome::Value(receiver))
}

fn map(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#map";

    expect_args!(runtime, SIGNATURE, args, []);

    elements(SIGNATURE, runtime, &receiver)?;
    let block = match block {
        Some(block) => block,
        None => return super::no_block(runtime),
    };

    let mut mapped = Vec::new();
    let mut index = 0;
    while let Some(value) = element_at(runtime, &receiver, index) {
        mapped.push(propagate!(runtime.call_proc(&block, vec![value], None)));
        index += 1;
    }
    Ok(Outcome::Value(runtime.new_array(mapped)))
}

fn select(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#select";

    expect_args!(runtime, SIGNATURE, args, []);

    elements(SIGNATURE, runtime, &receiver)?;
    let block = match block {
        Some(block) => block,
        None => return super::no_block(runtime),
    };

    let mut selected = Vec::new();
    let mut index = 0;
    while let Some(value) = element_at(runtime, &receiver, index) {
        let keep = propagate!(runtime.call_proc(&block, vec![value.clone()], None));
        if keep.is_truthy() {
            selected.push(value);
        }
        index += 1;
    }
    Ok(Outcome::Value(runtime.new_array(selected)))
}

fn inject(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#inject";

    let values = elements(SIGNATURE, runtime, &receiver)?;
    let (initial, operator) = match (args.as_slice(), &block) {
        ([], Some(_)) => (None, None),
        ([initial], Some(_)) => (Some(initial.clone()), None),
        ([Value::Symbol(operator)], None) => (None, Some(*operator)),
        ([initial, Value::Symbol(operator)], None) => (Some(initial.clone()), Some(*operator)),
        ([], None) => return super::no_block(runtime),
        ([other], None) | ([_, other], None) => {
            let message = format!("{} is not a symbol", runtime.inspect(other));
            return runtime.raise_type_error(message);
        }
        _ => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 0..2)",
                args.len()
            ))
        }
    };

    let mut values = values.into_iter();
    let mut accumulator = match initial.or_else(|| values.next()) {
        Some(accumulator) => accumulator,
        None => return Ok(Outcome::Value(Value::Nil)),
    };
    for value in values {
        accumulator = match (operator, &block) {
            (Some(operator), _) => {
                propagate!(runtime.dispatch(accumulator, operator, vec![value], None))
            }
            (None, Some(block)) => {
                propagate!(runtime.call_proc(block, vec![accumulator, value], None))
            }
            (None, None) => return super::no_block(runtime),
        };
    }
    Ok(Outcome::Value(accumulator))
}

/// Compare two values through `==`.
fn equals(runtime: &mut Runtime, a: &Value, b: &Value) -> Result<Result<bool, Outcome>, FatalError> {
    match runtime.send(a.clone(), "==", vec![b.clone()])? {
        Outcome::Value(result) => Ok(Ok(result.is_truthy())),
        outcome => Ok(Err(outcome)),
    }
}

fn includes(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#include?";

    expect_args!(runtime, SIGNATURE, args, [
        needle => needle,
    ]);

    for value in elements(SIGNATURE, runtime, &receiver)? {
        match equals(runtime, &value, &needle)? {
            Ok(true) => return Ok(Outcome::Value(Value::Boolean(true))),
            Ok(false) => {}
            Err(outcome) => return Ok(outcome),
        }
    }
    Ok(Outcome::Value(Value::Boolean(false)))
}

/// Join the elements of an array, nested arrays included.
fn join_into(
    runtime: &mut Runtime,
    id: ObjectId,
    separator: &str,
    visiting: &mut Vec<ObjectId>,
    out: &mut String,
) -> Result<Result<(), Outcome>, FatalError> {
    if visiting.contains(&id) {
        return runtime.raise_argument_error("recursive array join").map(Err);
    }
    visiting.push(id);

    let values = runtime.heap.array(id).cloned().unwrap_or_default();
    for (position, value) in values.iter().enumerate() {
        if position > 0 {
            out.push_str(separator);
        }
        let nested = value.as_object().filter(|id| runtime.heap.array(*id).is_some());
        if let Some(nested) = nested {
            if let Err(outcome) = join_into(runtime, nested, separator, visiting, out)? {
                return Ok(Err(outcome));
            }
            continue;
        }
        match runtime.stringify(value)? {
            ControlFlow::Continue(string) => out.push_str(&string),
            ControlFlow::Break(outcome) => return Ok(Err(outcome)),
        }
    }

    visiting.pop();
    Ok(Ok(()))
}

fn join(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#join";

    let separator = match args.as_slice() {
        [] | [Value::Nil] => String::new(),
        [value] => match runtime.string_of(value) {
            Some(separator) => separator,
            None => {
                let message = format!(
                    "no implicit conversion of {} into String",
                    runtime.module_name(runtime.class_of(value))
                );
                return runtime.raise_type_error(message);
            }
        },
        _ => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 0..1)",
                args.len()
            ))
        }
    };

    let id = match receiver.as_object() {
        Some(id) if runtime.heap.array(id).is_some() => id,
        _ => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    };
    let mut joined = String::new();
    if let Err(outcome) = join_into(runtime, id, &separator, &mut Vec::new(), &mut joined)? {
        return Ok(outcome);
    }
    Ok(Outcome::Value(runtime.new_string(joined)))
}

fn is_empty(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#empty?";

    expect_args!(runtime, SIGNATURE, args, []);

    let values = elements(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(Value::Boolean(values.is_empty())))
}

fn concatenate(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#+";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    let mut values = elements(SIGNATURE, runtime, &receiver)?;
    match runtime.array_of(&other) {
        Some(other) => values.extend(other),
        None => {
            let message = format!(
                "no implicit conversion of {} into Array",
                runtime.module_name(runtime.class_of(&other))
            );
            return runtime.raise_type_error(message);
        }
    }
    Ok(Outcome::Value(runtime.new_array(values)))
}

fn eq(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#==";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    if receiver == other {
        return Ok(Outcome::Value(Value::Boolean(true)));
    }
    let values = elements(SIGNATURE, runtime, &receiver)?;
    let others = match runtime.array_of(&other) {
        Some(others) if others.len() == values.len() => others,
        _ => return Ok(Outcome::Value(Value::Boolean(false))),
    };
    for (value, other) in values.iter().zip(others.iter()) {
        match equals(runtime, value, other)? {
            Ok(true) => {}
            Ok(false) => return Ok(Outcome::Value(Value::Boolean(false))),
            Err(outcome) => return Ok(outcome),
        }
    }
    Ok(Outcome::Value(Value::Boolean(true)))
}

fn reverse(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#reverse";

    expect_args!(runtime, SIGNATURE, args, []);

    let mut values = elements(SIGNATURE, runtime, &receiver)?;
    values.reverse();
    Ok(Outcome::Value(runtime.new_array(values)))
}

fn to_a(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#to_a";

    expect_args!(runtime, SIGNATURE, args, []);

    elements(SIGNATURE, runtime, &receiver)?;
    Ok(Outcome::Value(receiver))
}

/// Inspect the elements of an array, calling `inspect` on each of them.
fn inspect_into(
    runtime: &mut Runtime,
    id: ObjectId,
    visiting: &mut Vec<ObjectId>,
    out: &mut String,
) -> Result<Result<(), Outcome>, FatalError> {
    if visiting.contains(&id) {
        out.push_str("[...]");
        return Ok(Ok(()));
    }
    visiting.push(id);

    out.push('[');
    let values = runtime.heap.array(id).cloned().unwrap_or_default();
    for (position, value) in values.iter().enumerate() {
        if position > 0 {
            out.push_str(", ");
        }
        let nested = value.as_object().filter(|id| runtime.heap.array(*id).is_some());
        if let Some(nested) = nested {
            if let Err(outcome) = inspect_into(runtime, nested, visiting, out)? {
                return Ok(Err(outcome));
            }
            continue;
        }
        match runtime.inspect_value(value)? {
            ControlFlow::Continue(string) => out.push_str(&string),
            ControlFlow::Break(outcome) => return Ok(Err(outcome)),
        }
    }
    out.push(']');

    visiting.pop();
    Ok(Ok(()))
}

fn inspect(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Array#inspect";

    expect_args!(runtime, SIGNATURE, args, []);

    let id = match receiver.as_object() {
        Some(id) if runtime.heap.array(id).is_some() => id,
        _ => return Err(super::wrong_receiver(SIGNATURE, runtime, &receiver)),
    };
    let mut inspected = String::new();
    if let Err(outcome) = inspect_into(runtime, id, &mut Vec::new(), &mut inspected)? {
        return Ok(outcome);
    }
    Ok(Outcome::Value(runtime.new_string(inspected)))
}
