use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

use rand::Rng;

use crate::error::FatalError;
use crate::expect_args;
use crate::heap::{ObjectId, Payload};
use crate::interner::Interned;
use crate::invokable::{Eval, Outcome};
use crate::lambda::Lambda;
use crate::method::BoundMethod;
use crate::primitives::PrimitiveFn;
use crate::runtime::Runtime;
use crate::value::Value;
use crate::{proceed, propagate};

pub static INSTANCE_PRIMITIVES: &[(&str, PrimitiveFn)] = &[
    ("class", self::class),
    ("singleton_class", self::singleton_class),
    ("==", self::eq),
    ("!=", self::ne),
    ("equal?", self::eq),
    ("!", self::not),
    ("nil?", self::is_nil),
    ("is_a?", self::is_a),
    ("kind_of?", self::is_a),
    ("instance_of?", self::instance_of),
    ("respond_to?", self::respond_to),
    ("send", self::send),
    ("__send__", self::send),
    ("method", self::method),
    ("object_id", self::object_id),
    ("hash", self::hash),
    ("inspect", self::inspect),
    ("to_s", self::to_s),
    ("instance_variable_get", self::instance_variable_get),
    ("instance_variable_set", self::instance_variable_set),
    ("instance_variables", self::instance_variables),
    ("extend", self::extend),
    ("initialize", self::initialize),
    ("raise", self::raise),
    ("puts", self::puts),
    ("print", self::print),
    ("p", self::p),
    ("lambda", self::lambda),
    ("proc", self::make_proc),
    ("block_given?", self::block_given),
    ("rand", self::rand),
    ("loop", self::loop_forever),
];

fn class(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#class";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(Value::Object(runtime.class_of(&receiver))))
}

fn singleton_class(
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    _: Option<Value>,
) -> Eval {
    const SIGNATURE: &str = "Kernel#singleton_class";

    expect_args!(runtime, SIGNATURE, args, []);

    match runtime.singleton_class_of(&receiver)? {
        Some(singleton) => Ok(Outcome::Value(Value::Object(singleton))),
        None => runtime.raise_type_error("can't define singleton"),
    }
}

fn eq(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#==";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    Ok(Outcome::Value(Value::Boolean(receiver == other)))
}

fn ne(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#!=";

    expect_args!(runtime, SIGNATURE, args, [
        other => other,
    ]);

    let equal = propagate!(runtime.send(receiver, "==", vec![other]));
    Ok(Outcome::Value(Value::Boolean(!equal.is_truthy())))
}

fn not(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#!";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(Value::Boolean(!receiver.is_truthy())))
}

fn is_nil(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#nil?";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(Value::Boolean(receiver.is_nil())))
}

/// Get the class or module designated by an argument, or raise a `TypeError`.
fn expect_module(
    runtime: &mut Runtime,
    value: &Value,
) -> Result<Result<ObjectId, Outcome>, FatalError> {
    match value.as_object() {
        Some(id) if runtime.is_module_like(value) => Ok(Ok(id)),
        _ => runtime.raise_type_error("class or module required").map(Err),
    }
}

fn is_a(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#is_a?";

    expect_args!(runtime, SIGNATURE, args, [
        class => class,
    ]);

    let class = match expect_module(runtime, &class)? {
        Ok(class) => class,
        Err(outcome) => return Ok(outcome),
    };
    Ok(Outcome::Value(Value::Boolean(runtime.is_a(&receiver, class)?)))
}

fn instance_of(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#instance_of?";

    expect_args!(runtime, SIGNATURE, args, [
        class => class,
    ]);

    let class = match expect_module(runtime, &class)? {
        Ok(class) => class,
        Err(outcome) => return Ok(outcome),
    };
    Ok(Outcome::Value(Value::Boolean(runtime.class_of(&receiver) == class)))
}

fn respond_to(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#respond_to?";

    expect_args!(runtime, SIGNATURE, args, [
        name => name,
    ]);

    let name = match super::name_of(runtime, &name) {
        Some(name) => runtime.intern(&name),
        None => return super::not_a_name(runtime, &name),
    };
    Ok(Outcome::Value(Value::Boolean(runtime.responds_to(&receiver, name)?)))
}

fn send(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    let mut args = args.into_iter();
    let name = match args.next() {
        Some(name) => name,
        None => return runtime.raise_argument_error("no method name given"),
    };
    let name = match super::name_of(runtime, &name) {
        Some(name) => runtime.intern(&name),
        None => return super::not_a_name(runtime, &name),
    };
    runtime.dispatch(receiver, name, args.collect(), block)
}

fn method(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#method";

    expect_args!(runtime, SIGNATURE, args, [
        name => name,
    ]);

    let name = match super::name_of(runtime, &name) {
        Some(name) => runtime.intern(&name),
        None => return super::not_a_name(runtime, &name),
    };
    let klass = runtime.klass_of(&receiver);
    let method = match runtime.lookup_method(klass, name)? {
        Some(method) => method,
        None => {
            let message = format!(
                "undefined method `{}' for class `{}'",
                runtime.lookup_symbol(name),
                runtime.module_name(runtime.class_of(&receiver))
            );
            let class = runtime.core.name_error;
            return runtime.raise_named(class, message, name);
        }
    };
    let bound = BoundMethod { receiver, method };
    let id = runtime
        .heap
        .allocate(runtime.core.method, Payload::Method(bound));
    Ok(Outcome::Value(Value::Object(id)))
}

fn object_id(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#object_id";

    expect_args!(runtime, SIGNATURE, args, []);

    let id = match &receiver {
        Value::Boolean(false) => 0,
        Value::Nil => 8,
        Value::Boolean(true) => 20,
        Value::Integer(value) => value.wrapping_mul(2).wrapping_add(1),
        Value::Symbol(symbol) => 12 + 8 * i64::from(symbol.0),
        Value::Object(id) => 16 + 8 * id.index() as i64,
        Value::BigInteger(_) | Value::Float(_) => hash_value(runtime, &receiver),
    };
    Ok(Outcome::Value(Value::Integer(id)))
}

fn hash_value(runtime: &Runtime, value: &Value) -> i64 {
    let mut hasher = DefaultHasher::new();
    match value {
        Value::Object(id) => hasher.write_usize(id.index()),
        _ => hasher.write(runtime.inspect(value).as_bytes()),
    }
    hasher.finish() as i64
}

fn hash(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#hash";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(Value::Integer(hash_value(runtime, &receiver))))
}

fn inspect(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#inspect";

    expect_args!(runtime, SIGNATURE, args, []);

    let inspected = runtime.inspect(&receiver);
    Ok(Outcome::Value(runtime.new_string(inspected)))
}

fn to_s(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#to_s";

    expect_args!(runtime, SIGNATURE, args, []);

    let displayed = runtime.to_display(&receiver);
    Ok(Outcome::Value(runtime.new_string(displayed)))
}

/// Get the name of an instance variable, or raise a `NameError` if it is not one.
fn ivar_name(
    runtime: &mut Runtime,
    value: &Value,
) -> Result<Result<Interned, Outcome>, FatalError> {
    let name = match super::name_of(runtime, value) {
        Some(name) => name,
        None => return super::not_a_name(runtime, value).map(Err),
    };
    if !name.starts_with('@') || name.len() < 2 || name.starts_with("@@") {
        let message = format!("'{}' is not allowed as an instance variable name", name);
        let class = runtime.core.name_error;
        let symbol = runtime.intern(&name);
        return runtime.raise_named(class, message, symbol).map(Err);
    }
    Ok(Ok(runtime.intern(&name)))
}

fn instance_variable_get(
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    _: Option<Value>,
) -> Eval {
    const SIGNATURE: &str = "Kernel#instance_variable_get";

    expect_args!(runtime, SIGNATURE, args, [
        name => name,
    ]);

    let name = match ivar_name(runtime, &name)? {
        Ok(name) => name,
        Err(outcome) => return Ok(outcome),
    };
    Ok(Outcome::Value(runtime.ivar_get(&receiver, name)))
}

fn instance_variable_set(
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    _: Option<Value>,
) -> Eval {
    const SIGNATURE: &str = "Kernel#instance_variable_set";

    expect_args!(runtime, SIGNATURE, args, [
        name => name,
        value => value,
    ]);

    let name = match ivar_name(runtime, &name)? {
        Ok(name) => name,
        Err(outcome) => return Ok(outcome),
    };
    if !runtime.ivar_set(&receiver, name, value.clone()) {
        let message = format!(
            "can't modify frozen {}",
            runtime.module_name(runtime.class_of(&receiver))
        );
        let class = runtime.core.runtime_error;
        return runtime.raise(class, message);
    }
    Ok(Outcome::Value(value))
}

fn instance_variables(
    runtime: &mut Runtime,
    receiver: Value,
    args: Vec<Value>,
    _: Option<Value>,
) -> Eval {
    const SIGNATURE: &str = "Kernel#instance_variables";

    expect_args!(runtime, SIGNATURE, args, []);

    let names: Vec<Value> = match receiver.as_object() {
        Some(id) => runtime
            .heap
            .get(id)
            .ivars
            .keys()
            .filter(|name| !runtime.lookup_symbol(**name).starts_with("@__"))
            .map(|name| Value::Symbol(*name))
            .collect(),
        None => Vec::new(),
    };
    Ok(Outcome::Value(runtime.new_array(names)))
}

fn extend(runtime: &mut Runtime, receiver: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    if args.is_empty() {
        return runtime.raise_argument_error("wrong number of arguments (given 0, expected 1+)");
    }

    for module in args.iter().rev() {
        let id = match module.as_object() {
            Some(id) if runtime.is_plain_module(module) => id,
            _ => {
                let message = format!(
                    "wrong argument type {} (expected Module)",
                    runtime.module_name(runtime.class_of(module))
                );
                return runtime.raise_type_error(message);
            }
        };
        if !runtime.extend_object(&receiver, id)? {
            return runtime.raise_type_error("can't define singleton");
        }
    }

    Ok(Outcome::Value(receiver))
}

fn initialize(runtime: &mut Runtime, _: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#initialize";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(Value::Nil))
}

fn raise(runtime: &mut Runtime, _: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    if args.len() > 2 {
        return runtime.raise_argument_error(format!(
            "wrong number of arguments (given {}, expected 0..2)",
            args.len()
        ));
    }

    let mut args = args.into_iter();
    let exception = match (args.next(), args.next()) {
        (None, _) => {
            let class = runtime.core.runtime_error;
            runtime.new_exception(class, Some("unhandled exception".to_string()))
        }
        (Some(first), message) => {
            let string = match message {
                None => runtime.string_of(&first),
                Some(_) => None,
            };
            if let Some(string) = string {
                let class = runtime.core.runtime_error;
                runtime.new_exception(class, Some(string))
            } else if runtime.is_class(&first) {
                propagate!(runtime.send(first, "new", message.into_iter().collect()))
            } else if runtime.is_exception(&first) && message.is_none() {
                first
            } else {
                return runtime.raise_type_error("exception class/object expected");
            }
        }
    };

    if !runtime.is_exception(&exception) {
        return runtime.raise_type_error("exception object expected");
    }
    runtime.raise_value(exception)
}

/// Flatten nested arrays into their elements, the way `puts` prints them.
fn flatten_into(
    runtime: &mut Runtime,
    value: Value,
    visiting: &mut Vec<ObjectId>,
    out: &mut Vec<Value>,
) {
    let (id, values) = match value
        .as_object()
        .and_then(|id| runtime.heap.array(id).map(|values| (id, values.clone())))
    {
        Some(array) => array,
        None => return out.push(value),
    };
    if visiting.contains(&id) {
        out.push(runtime.new_string("[...]"));
        return;
    }
    visiting.push(id);
    for value in values {
        flatten_into(runtime, value, visiting, out);
    }
    visiting.pop();
}

fn puts(runtime: &mut Runtime, _: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    let mut values = Vec::new();
    for value in args {
        flatten_into(runtime, value, &mut Vec::new(), &mut values);
    }

    let mut text = String::new();
    if values.is_empty() {
        text.push('\n');
    }
    for value in values {
        let line = proceed!(runtime.stringify(&value));
        text.push_str(&line);
        if !line.ends_with('\n') {
            text.push('\n');
        }
    }

    runtime.write_output(&text);
    Ok(Outcome::Value(Value::Nil))
}

fn print(runtime: &mut Runtime, _: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    let mut text = String::new();
    for value in args {
        text.push_str(&proceed!(runtime.stringify(&value)));
    }

    runtime.write_output(&text);
    Ok(Outcome::Value(Value::Nil))
}

fn p(runtime: &mut Runtime, _: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    let mut text = String::new();
    for value in args.iter() {
        text.push_str(&proceed!(runtime.inspect_value(value)));
        text.push('\n');
    }
    runtime.write_output(&text);

    match args.len() {
        0 => Ok(Outcome::Value(Value::Nil)),
        1 => Ok(Outcome::Value(args.into_iter().next().unwrap_or(Value::Nil))),
        _ => Ok(Outcome::Value(runtime.new_array(args))),
    }
}

fn lambda(runtime: &mut Runtime, _: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#lambda";

    expect_args!(runtime, SIGNATURE, args, []);

    let block = match block {
        Some(block) => block,
        None => return runtime.raise_argument_error("tried to create Proc object without a block"),
    };
    let lambda = match block.as_object().and_then(|id| runtime.heap.lambda(id)) {
        Some(lambda) if lambda.is_lambda => return Ok(Outcome::Value(block)),
        Some(lambda) => Lambda {
            is_lambda: true,
            ..lambda.clone()
        },
        None => return Err(super::wrong_receiver(SIGNATURE, runtime, &block)),
    };
    let id = runtime.heap.allocate(runtime.core.proc, Payload::Lambda(lambda));
    Ok(Outcome::Value(Value::Object(id)))
}

fn make_proc(runtime: &mut Runtime, _: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#proc";

    expect_args!(runtime, SIGNATURE, args, []);

    match block {
        Some(block) => Ok(Outcome::Value(block)),
        None => runtime.raise_argument_error("tried to create Proc object without a block"),
    }
}

fn block_given(runtime: &mut Runtime, _: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#block_given?";

    expect_args!(runtime, SIGNATURE, args, []);

    Ok(Outcome::Value(Value::Boolean(runtime.method_block().is_some())))
}

fn rand(runtime: &mut Runtime, _: Value, args: Vec<Value>, _: Option<Value>) -> Eval {
    let mut rng = rand::thread_rng();
    let limit = match args.len() {
        0 => Value::Nil,
        1 => args[0].clone(),
        given => {
            return runtime.raise_argument_error(format!(
                "wrong number of arguments (given {}, expected 0..1)",
                given
            ))
        }
    };

    match limit {
        Value::Nil | Value::Integer(0) => Ok(Outcome::Value(Value::Float(rng.gen::<f64>()))),
        Value::Integer(limit) => match limit.checked_abs() {
            Some(limit) => Ok(Outcome::Value(Value::Integer(rng.gen_range(0..limit)))),
            None => runtime.raise_argument_error(format!("invalid argument - {}", limit)),
        },
        Value::Float(limit) if limit.is_finite() && limit != 0.0 => {
            Ok(Outcome::Value(Value::Float(rng.gen::<f64>() * limit.abs())))
        }
        other => {
            let message = format!("invalid argument - {}", runtime.inspect(&other));
            runtime.raise_argument_error(message)
        }
    }
}

fn loop_forever(runtime: &mut Runtime, _: Value, args: Vec<Value>, block: Option<Value>) -> Eval {
    const SIGNATURE: &str = "Kernel#loop";

    expect_args!(runtime, SIGNATURE, args, []);

    let block = match block {
        Some(block) => block,
        None => return super::no_block(runtime),
    };
    loop {
        propagate!(runtime.call_proc(&block, Vec::new(), None));
    }
}
